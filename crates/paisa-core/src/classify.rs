//! Sender classification
//!
//! Maps an SMS sender address to the rule that should parse it. Rules are
//! checked most-specific first: every exact pattern, then every prefix
//! pattern, then every regex. Unknown senders get the generic fallback rule.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::{BankRule, RuleCatalog, SenderMatchKind};

/// Carrier/circle prefix on DLT headers: "VM-HDFCBK", "AD-ICICIB"
static CARRIER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}-").expect("valid regex"));

/// Message category suffix on DLT headers: "HDFCBK-S", "ICICIT-T"
static CATEGORY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-[STPG]$").expect("valid regex"));

/// Result of classifying a sender
#[derive(Debug, Clone)]
pub struct SenderMatch<'a> {
    pub rule: &'a BankRule,
    /// Normalized sender header
    pub sender: String,
    /// How the rule matched; `None` for the fallback
    pub kind: Option<SenderMatchKind>,
    /// Short code, bank keyword or aggregator alias
    pub bank_like: bool,
}

impl SenderMatch<'_> {
    /// A specific (non-fallback) rule matched
    pub fn is_specific(&self) -> bool {
        self.kind.is_some()
    }

    /// Bank name recorded on the candidate
    pub fn bank_name(&self) -> &str {
        if self.is_specific() {
            &self.rule.bank_name
        } else {
            &self.sender
        }
    }
}

/// Uppercase, trim and strip carrier prefix and category suffix
pub fn normalize_sender(address: &str) -> String {
    let upper = address.trim().to_uppercase();
    let without_prefix = CARRIER_PREFIX.replace(&upper, "");
    CATEGORY_SUFFIX.replace(&without_prefix, "").trim().to_string()
}

/// Classifies senders against a catalog
#[derive(Debug, Clone, Copy)]
pub struct SenderClassifier<'a> {
    catalog: &'a RuleCatalog,
}

impl<'a> SenderClassifier<'a> {
    pub fn new(catalog: &'a RuleCatalog) -> Self {
        Self { catalog }
    }

    pub fn classify(&self, address: &str) -> SenderMatch<'a> {
        let sender = normalize_sender(address);
        let bank_like = self.catalog.heuristics().is_bank_like(&sender);

        let tiers = [
            SenderMatchKind::Exact,
            SenderMatchKind::Prefix,
            SenderMatchKind::Regex,
        ];
        for kind in tiers {
            // Rules are already in priority order
            let found = self.catalog.rules().iter().find(|rule| {
                rule.sender_patterns
                    .iter()
                    .any(|p| p.kind() == kind && p.matches(&sender))
            });
            if let Some(rule) = found {
                return SenderMatch {
                    rule,
                    sender,
                    kind: Some(kind),
                    bank_like: true,
                };
            }
        }

        SenderMatch {
            rule: self.catalog.fallback(),
            sender,
            kind: None,
            bank_like,
        }
    }
}
