//! Bulk scan: runs the pipeline over a message history
//!
//! Messages are processed one at a time. Every completed message leaves the
//! scan in a consistent state, so a caller may stop between any two messages
//! and still read a valid summary. Yielding to an executor is the caller's
//! concern; the scan itself is synchronous.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::dedup::{DedupIndex, Offer};
use crate::merchant::{GroupSuggestion, MerchantGrouper};
use crate::models::{CandidateTransaction, ParseResult, RawSms, RejectReason, ReviewStatus};
use crate::pipeline::{Pipeline, PipelineConfig};

/// Progress callback: (summary so far)
pub type ProgressCallback = Box<dyn Fn(&ScanSummary) + Send + Sync>;

/// Options for a bulk scan
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Skip messages at or before this sync cursor (millis)
    pub since_millis: Option<i64>,
    /// Invoke the progress callback every N processed messages (0 = never)
    pub progress_every: u64,
}

impl ScanOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            since_millis: None,
            progress_every: config.progress_every,
        }
    }
}

/// Running totals for a scan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanSummary {
    /// Messages run through the pipeline
    pub processed: u64,
    /// Messages skipped by the sync cursor
    pub skipped: u64,
    pub accepted: u64,
    pub monitored: u64,
    pub needs_review: u64,
    pub rejected: BTreeMap<RejectReason, u64>,
    /// Successful parses the index did not add as a new event
    pub duplicates: u64,
    /// Latest processed timestamp; the next scan's sync cursor
    pub last_timestamp: Option<i64>,
}

impl ScanSummary {
    pub fn rejected_total(&self) -> u64 {
        self.rejected.values().sum()
    }

    pub fn successes(&self) -> u64 {
        self.accepted + self.monitored + self.needs_review
    }
}

/// What happened to one pushed message
#[derive(Debug, Clone, PartialEq)]
pub enum ScanStep {
    Skipped,
    Rejected(RejectReason),
    Offered { status: ReviewStatus, offer: Offer },
}

/// Final output of a scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub summary: ScanSummary,
    pub records: Vec<CandidateTransaction>,
    pub groups: Vec<GroupSuggestion>,
}

/// Incremental bulk scan over one pipeline
pub struct BulkScan<'a> {
    pipeline: &'a Pipeline,
    options: ScanOptions,
    summary: ScanSummary,
    index: DedupIndex,
    grouper: MerchantGrouper,
    progress: Option<ProgressCallback>,
}

impl<'a> BulkScan<'a> {
    pub fn new(pipeline: &'a Pipeline, options: ScanOptions) -> Self {
        Self {
            pipeline,
            options,
            summary: ScanSummary::default(),
            index: DedupIndex::new(),
            grouper: MerchantGrouper::new(pipeline.catalog().aliases().to_vec()),
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Process one message
    pub fn push(&mut self, sms: &RawSms) -> ScanStep {
        if self
            .options
            .since_millis
            .is_some_and(|since| sms.timestamp <= since)
        {
            self.summary.skipped += 1;
            return ScanStep::Skipped;
        }

        let result = self.pipeline.parse(sms);
        self.summary.processed += 1;
        self.summary.last_timestamp = Some(
            self.summary
                .last_timestamp
                .map_or(sms.timestamp, |last| last.max(sms.timestamp)),
        );

        let step = match result {
            ParseResult::Rejected(reason) => {
                *self.summary.rejected.entry(reason).or_insert(0) += 1;
                ScanStep::Rejected(reason)
            }
            ParseResult::Success(candidate) => {
                let status = candidate.status;
                match status {
                    ReviewStatus::Accepted => self.summary.accepted += 1,
                    ReviewStatus::Monitored => self.summary.monitored += 1,
                    ReviewStatus::NeedsReview => self.summary.needs_review += 1,
                }
                if candidate.normalized_merchant != crate::models::UNKNOWN_MERCHANT {
                    self.grouper.add(&candidate.normalized_merchant);
                }
                let offer = self.index.offer(*candidate);
                if offer.is_duplicate() {
                    self.summary.duplicates += 1;
                    debug!(?offer, "Duplicate candidate");
                }
                ScanStep::Offered { status, offer }
            }
        };

        if let Some(callback) = &self.progress {
            let every = self.options.progress_every;
            if every > 0 && self.summary.processed % every == 0 {
                callback(&self.summary);
            }
        }

        step
    }

    /// Process every message from an iterator
    pub fn run<'m>(&mut self, messages: impl IntoIterator<Item = &'m RawSms>) {
        for sms in messages {
            self.push(sms);
        }
    }

    pub fn summary(&self) -> &ScanSummary {
        &self.summary
    }

    pub fn index(&self) -> &DedupIndex {
        &self.index
    }

    pub fn suggestions(&self) -> Vec<GroupSuggestion> {
        self.grouper.suggestions()
    }

    pub fn finish(self) -> ScanReport {
        let groups = self.grouper.suggestions();
        info!(
            "Scan finished: {} processed, {} retained, {} rejected",
            self.summary.processed,
            self.index.len(),
            self.summary.rejected_total()
        );
        ScanReport {
            summary: self.summary,
            records: self.index.into_records(),
            groups,
        }
    }
}
