//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `common` - Shared utilities (catalog loading, result printing)
//! - `parse` - Single-message live path
//! - `scan` - Bulk scan over an SMS export
//! - `rules` - Rule catalog listing and validation
//! - `normalize` - Merchant normalization

pub mod common;
pub mod normalize;
pub mod parse;
pub mod rules;
pub mod scan;

// Re-export command functions for main.rs
pub use common::*;
pub use normalize::*;
pub use parse::*;
pub use rules::*;
pub use scan::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
