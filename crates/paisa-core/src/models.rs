//! Domain models for Paisa

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Normalized merchant used when a message carries no extractable merchant
pub const UNKNOWN_MERCHANT: &str = "UNKNOWN";

/// A raw SMS as delivered by the live push path or read by the bulk scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSms {
    /// Sender header (e.g. "VM-HDFCBK") or phone number
    pub address: String,
    pub body: String,
    /// Delivery time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl RawSms {
    pub fn new(address: impl Into<String>, body: impl Into<String>, timestamp: i64) -> Self {
        Self {
            address: address.into(),
            body: body.into(),
            timestamp,
        }
    }

    /// Delivery time as a UTC datetime, if the timestamp is representable
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Fields scored by the confidence calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Sender,
    Amount,
    Merchant,
    Date,
    Direction,
    Reference,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Amount => "amount",
            Self::Merchant => "merchant",
            Self::Date => "date",
            Self::Direction => "direction",
            Self::Reference => "reference",
        }
    }

    pub fn all() -> &'static [Field] {
        &[
            Self::Sender,
            Self::Amount,
            Self::Merchant,
            Self::Date,
            Self::Direction,
            Self::Reference,
        ]
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Money movement direction relative to the account holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

/// A field value found in the message body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extracted<T> {
    pub value: T,
    /// Matched text as it appeared in the body
    pub raw: String,
    /// Byte offset of the match in the body
    pub offset: usize,
}

/// Resolved transaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirectionMatch {
    pub direction: Direction,
    pub offset: usize,
    /// Both debit and credit phrases were present; the earlier one won
    pub ambiguous: bool,
}

/// Raw extraction output for one message
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedFields {
    pub amount: Option<Extracted<f64>>,
    pub merchant: Option<Extracted<String>>,
    pub date: Option<Extracted<NaiveDate>>,
    pub direction: Option<DirectionMatch>,
    pub reference: Option<Extracted<String>>,
    /// First amount token that matched a pattern but failed to parse
    pub malformed_amount: Option<String>,
    /// First date token that matched a pattern but failed to parse
    pub malformed_date: Option<String>,
}

/// Quality assessment for a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfidence {
    pub extracted: bool,
    pub score: f64,
    pub value: Option<String>,
}

impl FieldConfidence {
    pub fn missing() -> Self {
        Self {
            extracted: false,
            score: 0.0,
            value: None,
        }
    }
}

/// Weighted confidence for a parsed message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    /// Weighted sum of field scores, clamped to [0, 1]
    pub overall: f64,
    pub breakdown: BTreeMap<Field, FieldConfidence>,
}

impl ConfidenceScore {
    pub fn field(&self, field: Field) -> Option<&FieldConfidence> {
        self.breakdown.get(&field)
    }

    pub fn is_extracted(&self, field: Field) -> bool {
        self.field(field).map(|f| f.extracted).unwrap_or(false)
    }
}

/// Numeric decision band for an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBand {
    AutoAccept,
    Monitor,
    Review,
}

/// Terminal state of a successful parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Auto-accept: threshold met and amount, merchant, reference all extracted
    Accepted,
    /// Accepted but surfaced for monitoring
    Monitored,
    /// Queued for manual review
    NeedsReview,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Monitored => "monitored",
            Self::NeedsReview => "needs_review",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed, scored transaction ready for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTransaction {
    pub amount: f64,
    pub normalized_merchant: String,
    pub raw_merchant: String,
    pub bank_name: String,
    /// Code of the rule that matched the sender, "GENERIC" for the fallback
    pub rule_code: String,
    pub is_debit: bool,
    pub transaction_date: NaiveDate,
    pub received_at: DateTime<Utc>,
    pub reference_number: Option<String>,
    pub confidence: ConfidenceScore,
    pub status: ReviewStatus,
    pub dedup_key: String,
    /// Verbatim hash of (sender, body, timestamp)
    pub source_id: String,
    pub raw_body: String,
}

impl CandidateTransaction {
    /// True only when the auto-accept gate passed
    pub fn is_auto_accept(&self) -> bool {
        self.status == ReviewStatus::Accepted
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Why a message did not produce a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RejectReason {
    NoSenderMatch,
    NoAmount,
    NoReferenceNumber,
    BelowReviewThreshold,
    MalformedAmount,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSenderMatch => "NoSenderMatch",
            Self::NoAmount => "NoAmount",
            Self::NoReferenceNumber => "NoReferenceNumber",
            Self::BelowReviewThreshold => "BelowReviewThreshold",
            Self::MalformedAmount => "MalformedAmount",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of parsing one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum ParseResult {
    Success(Box<CandidateTransaction>),
    Rejected(RejectReason),
}

impl ParseResult {
    pub fn candidate(&self) -> Option<&CandidateTransaction> {
        match self {
            Self::Success(candidate) => Some(candidate),
            Self::Rejected(_) => None,
        }
    }

    pub fn into_candidate(self) -> Option<CandidateTransaction> {
        match self {
            Self::Success(candidate) => Some(*candidate),
            Self::Rejected(_) => None,
        }
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Success(_) => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Pipeline states for a single message; no state is revisited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseState {
    Received,
    Classified,
    Extracted,
    Scored,
    Accepted,
    Monitored,
    NeedsReview,
    Rejected,
}

impl ParseState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Monitored | Self::NeedsReview | Self::Rejected
        )
    }
}

impl From<ReviewStatus> for ParseState {
    fn from(status: ReviewStatus) -> Self {
        match status {
            ReviewStatus::Accepted => Self::Accepted,
            ReviewStatus::Monitored => Self::Monitored,
            ReviewStatus::NeedsReview => Self::NeedsReview,
        }
    }
}
