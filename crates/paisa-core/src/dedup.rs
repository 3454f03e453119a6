//! Deduplication keys and the in-memory dedup index
//!
//! Two keys protect against different failure modes:
//! - `dedup_key` recognizes the same economic event parsed from different raw
//!   text (live receipt vs. a later historical re-scan)
//! - `sms_hash` recognizes verbatim re-delivery of the same SMS
//!
//! `DedupIndex` implements the check-then-insert contract the persistence
//! layer must provide on both keys.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::models::CandidateTransaction;

/// Field separator inside the dedup key
pub const DEDUP_KEY_SEPARATOR: char = '|';

/// Deterministic key over (normalized merchant, amount to 2dp, day, bank)
pub fn dedup_key(normalized_merchant: &str, amount: f64, date: NaiveDate, bank_name: &str) -> String {
    format!(
        "{merchant}{sep}{amount:.2}{sep}{date}{sep}{bank}",
        merchant = normalized_merchant,
        amount = amount,
        date = date.format("%Y-%m-%d"),
        bank = bank_name.trim().to_uppercase(),
        sep = DEDUP_KEY_SEPARATOR,
    )
}

/// SHA-256 over (sender, body, timestamp), hex encoded
pub fn sms_hash(address: &str, body: &str, timestamp: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(address.as_bytes());
    // Separators keep ("AB", "C") and ("A", "BC") apart
    hasher.update([0u8]);
    hasher.update(body.as_bytes());
    hasher.update([0u8]);
    hasher.update(timestamp.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Outcome of offering a candidate to the index
#[derive(Debug, Clone, PartialEq)]
pub enum Offer {
    /// New economic event
    Inserted,
    /// Same SMS seen before; dropped
    VerbatimDuplicate,
    /// Same dedup key; the new candidate won and replaced `previous`
    Replaced { previous: Box<CandidateTransaction> },
    /// Same dedup key; the retained record has higher confidence
    Kept { existing_source_id: String },
}

impl Offer {
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, Self::Inserted)
    }
}

/// In-memory index enforcing uniqueness on both keys
#[derive(Debug, Default)]
pub struct DedupIndex {
    records: Vec<CandidateTransaction>,
    by_key: HashMap<String, usize>,
    seen_sources: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-then-insert on both keys
    ///
    /// On a dedup key conflict the higher-confidence candidate is retained;
    /// ties go to the most recently offered one.
    pub fn offer(&mut self, candidate: CandidateTransaction) -> Offer {
        if !self.seen_sources.insert(candidate.source_id.clone()) {
            return Offer::VerbatimDuplicate;
        }

        let existing_idx = self.by_key.get(&candidate.dedup_key).copied();
        match existing_idx {
            Some(idx) => {
                let existing = &mut self.records[idx];
                if candidate.confidence.overall >= existing.confidence.overall {
                    let previous = std::mem::replace(existing, candidate);
                    Offer::Replaced {
                        previous: Box::new(previous),
                    }
                } else {
                    Offer::Kept {
                        existing_source_id: existing.source_id.clone(),
                    }
                }
            }
            None => {
                self.by_key
                    .insert(candidate.dedup_key.clone(), self.records.len());
                self.records.push(candidate);
                Offer::Inserted
            }
        }
    }

    pub fn contains_key(&self, dedup_key: &str) -> bool {
        self.by_key.contains_key(dedup_key)
    }

    pub fn contains_source(&self, source_id: &str) -> bool {
        self.seen_sources.contains(source_id)
    }

    pub fn get(&self, dedup_key: &str) -> Option<&CandidateTransaction> {
        self.by_key.get(dedup_key).map(|&idx| &self.records[idx])
    }

    /// Retained records in first-insertion order
    pub fn records(&self) -> &[CandidateTransaction] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CandidateTransaction> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_candidate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()
    }

    #[test]
    fn test_dedup_key_format() {
        assert_eq!(
            dedup_key("SWIGGY BANGALORE", 250.0, date(), "HDFC Bank"),
            "SWIGGY BANGALORE|250.00|2024-12-25|HDFC BANK"
        );
    }

    #[test]
    fn test_dedup_key_rounds_to_two_places() {
        assert_eq!(
            dedup_key("X", 99.999, date(), "B"),
            dedup_key("X", 100.0, date(), "B")
        );
        assert_ne!(
            dedup_key("X", 100.0, date(), "B"),
            dedup_key("X", 100.01, date(), "B")
        );
    }

    #[test]
    fn test_sms_hash_is_stable_and_field_sensitive() {
        let a = sms_hash("HDFCBK", "body", 1);
        assert_eq!(a, sms_hash("HDFCBK", "body", 1));
        assert_eq!(a.len(), 64);
        assert_ne!(a, sms_hash("HDFCBK", "body", 2));
        assert_ne!(sms_hash("AB", "C", 1), sms_hash("A", "BC", 1));
    }

    #[test]
    fn test_offer_inserts_then_detects_verbatim() {
        let mut index = DedupIndex::new();
        let c = sample_candidate("src-1", 0.9);
        assert_eq!(index.offer(c.clone()), Offer::Inserted);
        assert_eq!(index.offer(c), Offer::VerbatimDuplicate);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_offer_prefers_higher_confidence() {
        let mut index = DedupIndex::new();
        index.offer(sample_candidate("src-1", 0.9));

        let outcome = index.offer(sample_candidate("src-2", 0.7));
        assert_eq!(
            outcome,
            Offer::Kept {
                existing_source_id: "src-1".to_string()
            }
        );

        let outcome = index.offer(sample_candidate("src-3", 0.95));
        assert!(matches!(outcome, Offer::Replaced { ref previous } if previous.source_id == "src-1"));
        assert_eq!(index.len(), 1);
        assert_eq!(index.records()[0].source_id, "src-3");
        // The replaced SMS is still known
        assert!(index.contains_source("src-1"));
    }

    #[test]
    fn test_offer_tie_goes_to_latest() {
        let mut index = DedupIndex::new();
        index.offer(sample_candidate("src-1", 0.8));
        let outcome = index.offer(sample_candidate("src-2", 0.8));
        assert!(outcome.is_duplicate());
        assert!(matches!(outcome, Offer::Replaced { .. }));
        let key = index.records()[0].dedup_key.clone();
        assert_eq!(index.get(&key).unwrap().source_id, "src-2");
    }
}
