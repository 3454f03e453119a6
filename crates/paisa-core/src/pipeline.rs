//! Transaction assembly: the single-message parse pipeline
//!
//! `Received -> Classified -> Extracted -> Scored -> terminal`, where the
//! terminal state is Accepted, Monitored, NeedsReview or Rejected. No state
//! is revisited and a message is never retried internally.
//!
//! `Pipeline::parse` is infallible and holds no mutable state; the catalog is
//! shared read-only, so one pipeline can serve any number of threads.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::classify::SenderClassifier;
use crate::confidence::{BandThresholds, ConfidenceCalculator};
use crate::dedup::{dedup_key, sms_hash};
use crate::error::{Error, Result};
use crate::extract::FieldExtractor;
use crate::merchant::normalize_merchant;
use crate::models::{
    CandidateTransaction, ConfidenceScore, DecisionBand, Direction, Field, ParseResult, ParseState,
    RawSms, RejectReason, ReviewStatus, UNKNOWN_MERCHANT,
};
use crate::rules::RuleCatalog;

/// Pipeline tuning, from the `[pipeline]` catalog section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Overall score at or above which a candidate may be auto-accepted
    pub auto_accept_threshold: f64,
    /// Overall score at or above which a candidate is accepted and monitored
    pub monitor_threshold: f64,
    /// Below this the message is rejected instead of queued for review
    pub review_floor: f64,
    /// Reject senders that match no rule and do not look like a bank
    pub strict_senders: bool,
    /// Offset used to derive the calendar day from the SMS timestamp
    pub utc_offset_minutes: i32,
    /// Live path deadline (enforced by the caller)
    pub live_timeout_ms: u64,
    /// Bulk scan progress callback cadence, in messages
    pub progress_every: u64,
    /// Bulk scan cooperative yield cadence, in messages
    pub yield_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            auto_accept_threshold: 0.85,
            monitor_threshold: 0.50,
            review_floor: 0.40,
            strict_senders: false,
            utc_offset_minutes: 330, // IST
            live_timeout_ms: 250,
            progress_every: 100,
            yield_every: 50,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("auto_accept_threshold", self.auto_accept_threshold),
            ("monitor_threshold", self.monitor_threshold),
            ("review_floor", self.review_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::RuleCatalog(format!(
                    "[pipeline] {} = {} is outside [0, 1]",
                    name, value
                )));
            }
        }
        if !(self.review_floor <= self.monitor_threshold
            && self.monitor_threshold <= self.auto_accept_threshold)
        {
            return Err(Error::RuleCatalog(
                "[pipeline] thresholds must satisfy review_floor <= monitor_threshold <= auto_accept_threshold"
                    .to_string(),
            ));
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(Error::RuleCatalog(format!(
                "[pipeline] utc_offset_minutes = {} is out of range",
                self.utc_offset_minutes
            )));
        }
        if self.live_timeout_ms == 0 {
            return Err(Error::RuleCatalog(
                "[pipeline] live_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bands(&self) -> BandThresholds {
        BandThresholds {
            auto_accept: self.auto_accept_threshold,
            monitor: self.monitor_threshold,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar day of an instant in the configured offset
    pub fn local_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset()).date_naive()
    }
}

/// The parse pipeline bound to one rule catalog
#[derive(Debug, Clone)]
pub struct Pipeline {
    catalog: Arc<RuleCatalog>,
    calculator: ConfidenceCalculator,
}

impl Pipeline {
    pub fn new(catalog: RuleCatalog) -> Self {
        Self::from_shared(Arc::new(catalog))
    }

    pub fn from_shared(catalog: Arc<RuleCatalog>) -> Self {
        let calculator = ConfidenceCalculator::new(catalog.scoring_config().clone());
        Self {
            catalog,
            calculator,
        }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &PipelineConfig {
        self.catalog.pipeline_config()
    }

    /// Parse one SMS into a candidate or a typed rejection
    pub fn parse(&self, sms: &RawSms) -> ParseResult {
        let config = self.config();
        let source_id = sms_hash(&sms.address, &sms.body, sms.timestamp);
        let trace_id = &source_id[..12];
        debug!(source = trace_id, state = ?ParseState::Received, sender = %sms.address);

        let sender = SenderClassifier::new(&self.catalog).classify(&sms.address);
        if config.strict_senders && !sender.is_specific() && !sender.bank_like {
            return reject(trace_id, RejectReason::NoSenderMatch);
        }
        debug!(
            source = trace_id,
            state = ?ParseState::Classified,
            rule = %sender.rule.code,
            specific = sender.is_specific()
        );

        let fields = FieldExtractor::new(sender.rule).extract(&sms.body);
        debug!(
            source = trace_id,
            state = ?ParseState::Extracted,
            amount = fields.amount.is_some(),
            merchant = fields.merchant.is_some(),
            reference = fields.reference.is_some()
        );

        let amount = match &fields.amount {
            Some(amount) => amount.value,
            None if fields.malformed_amount.is_some() => {
                return reject(trace_id, RejectReason::MalformedAmount)
            }
            None => return reject(trace_id, RejectReason::NoAmount),
        };
        let Some(reference) = &fields.reference else {
            return reject(trace_id, RejectReason::NoReferenceNumber);
        };

        let confidence = self.calculator.score(
            &fields,
            &sms.body,
            sender.is_specific(),
            &sender.rule.weights,
        );
        debug!(source = trace_id, state = ?ParseState::Scored, overall = confidence.overall);
        if confidence.overall < config.review_floor {
            return reject(trace_id, RejectReason::BelowReviewThreshold);
        }

        let status = review_status(&confidence, &config.bands());

        let received_at = sms.received_at().unwrap_or_else(|| {
            warn!(source = trace_id, timestamp = sms.timestamp, "Timestamp out of range");
            DateTime::<Utc>::default()
        });
        let transaction_date = fields
            .date
            .as_ref()
            .map(|d| d.value)
            .unwrap_or_else(|| config.local_day(received_at));

        let raw_merchant = fields
            .merchant
            .as_ref()
            .map(|m| m.value.clone())
            .unwrap_or_default();
        let normalized_merchant = if raw_merchant.is_empty() {
            UNKNOWN_MERCHANT.to_string()
        } else {
            normalize_merchant(&raw_merchant)
        };

        let bank_name = sender.bank_name().to_string();
        let dedup_key = dedup_key(&normalized_merchant, amount, transaction_date, &bank_name);
        // No direction phrase: most alerts are spends
        let is_debit = fields
            .direction
            .map(|d| d.direction == Direction::Debit)
            .unwrap_or(true);

        debug!(source = trace_id, state = ?ParseState::from(status), dedup_key = %dedup_key);

        ParseResult::Success(Box::new(CandidateTransaction {
            amount,
            normalized_merchant,
            raw_merchant,
            bank_name,
            rule_code: sender.rule.code.clone(),
            is_debit,
            transaction_date,
            received_at,
            reference_number: Some(reference.value.clone()),
            confidence,
            status,
            dedup_key,
            source_id,
            raw_body: sms.body.clone(),
        }))
    }
}

/// Decision band plus the hard extraction gate on auto-accept
fn review_status(confidence: &ConfidenceScore, bands: &BandThresholds) -> ReviewStatus {
    let gate = [Field::Amount, Field::Merchant, Field::Reference]
        .iter()
        .all(|f| confidence.is_extracted(*f));

    match bands.band(confidence.overall) {
        DecisionBand::AutoAccept if gate => ReviewStatus::Accepted,
        DecisionBand::AutoAccept | DecisionBand::Monitor => ReviewStatus::Monitored,
        DecisionBand::Review => ReviewStatus::NeedsReview,
    }
}

fn reject(trace_id: &str, reason: RejectReason) -> ParseResult {
    debug!(source = trace_id, state = ?ParseState::Rejected, %reason);
    ParseResult::Rejected(reason)
}
