//! Error types for Paisa
//!
//! Only rule catalog loading can fail. Per-message problems never surface as
//! errors; they are reported as `ParseResult::Rejected`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Rule catalog error: {0}")]
    RuleCatalog(String),

    #[error("Invalid pattern in rule {rule}: {pattern}: {source}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid catalog TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
