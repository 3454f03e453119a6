//! Paisa Core Library
//!
//! Turns bank and payment-app SMS alerts into structured transactions:
//! - Rule catalog of per-provider sender and field patterns (TOML)
//! - Sender classification with a generic fallback rule
//! - Field extraction (amount, merchant, date, direction, reference number)
//! - Merchant normalization and grouping suggestions
//! - Confidence scoring with decision bands and an auto-accept gate
//! - Dedup keys and an in-memory dedup index
//! - Bulk scan driver with progress reporting

pub mod classify;
pub mod confidence;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod merchant;
pub mod models;
pub mod pipeline;
pub mod rules;
pub mod scan;

/// SMS fixtures shared with the CLI tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use classify::{normalize_sender, SenderClassifier, SenderMatch};
pub use confidence::{BandThresholds, ConfidenceCalculator, ConfidenceWeights, ScoringConfig};
pub use dedup::{dedup_key, sms_hash, DedupIndex, Offer};
pub use error::{Error, Result};
pub use extract::FieldExtractor;
pub use merchant::{grouping_key, normalize_merchant, GroupSuggestion, MerchantGrouper};
pub use models::{
    CandidateTransaction, ConfidenceScore, Direction, Field, FieldConfidence, ParseResult,
    ParseState, RawSms, RejectReason, ReviewStatus,
};
pub use pipeline::{Pipeline, PipelineConfig};
pub use rules::{BankRule, CatalogOrigin, RuleCatalog, SenderPattern};
pub use scan::{BulkScan, ProgressCallback, ScanOptions, ScanReport, ScanStep, ScanSummary};
