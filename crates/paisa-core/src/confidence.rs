//! Confidence scoring for extracted fields
//!
//! Each field gets a score in [0, 1]; the overall score is the weighted sum of
//! the field scores using the matched rule's weights, clamped to [0, 1].
//! Direction is scored for diagnostics but carries no weight.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{ConfidenceScore, DecisionBand, ExtractedFields, Field, FieldConfidence};

/// Tolerance when checking that weights sum to 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

/// Per-rule field weights
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConfidenceWeights {
    pub sender: f64,
    pub amount: f64,
    pub merchant: f64,
    pub date: f64,
    pub reference: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            sender: 0.25,
            amount: 0.25,
            merchant: 0.20,
            date: 0.10,
            reference: 0.20,
        }
    }
}

impl ConfidenceWeights {
    /// Weight applied to a field's score
    pub fn weight(&self, field: Field) -> f64 {
        match field {
            Field::Sender => self.sender,
            Field::Amount => self.amount,
            Field::Merchant => self.merchant,
            Field::Date => self.date,
            Field::Reference => self.reference,
            Field::Direction => 0.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.sender + self.amount + self.merchant + self.date + self.reference
    }

    /// Check every weight is in [0, 1] and the weights sum to 1.0
    pub fn validate(&self) -> Result<()> {
        for field in Field::all() {
            let w = self.weight(*field);
            if !(0.0..=1.0).contains(&w) {
                return Err(Error::RuleCatalog(format!(
                    "{} weight {} is outside [0, 1]",
                    field, w
                )));
            }
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::RuleCatalog(format!(
                "weights sum to {:.3}, expected 1.0",
                self.sum()
            )));
        }
        Ok(())
    }
}

/// Tuning parameters for field scoring
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Amounts starting within this many characters of the body start score higher
    pub amount_position_window: usize,
    /// Plausible amount range (inclusive)
    pub amount_min: f64,
    pub amount_max: f64,
    /// Plausible merchant length range (inclusive, in characters)
    pub merchant_min_len: usize,
    pub merchant_max_len: usize,
    /// Promotional/noise keywords that mark a merchant value as suspicious
    pub noise_keywords: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            amount_position_window: 50,
            amount_min: 1.0,
            amount_max: 100_000.0,
            merchant_min_len: 3,
            merchant_max_len: 50,
            noise_keywords: [
                "OFFER",
                "CASHBACK",
                "WIN",
                "FREE",
                "LOAN",
                "APPLY",
                "CLICK",
                "REWARD",
                "CONGRATULATIONS",
                "ELIGIBLE",
                "LIMITED TIME",
                "DISCOUNT",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Thresholds for decision bands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandThresholds {
    pub auto_accept: f64,
    pub monitor: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            auto_accept: 0.85,
            monitor: 0.50,
        }
    }
}

impl BandThresholds {
    pub fn band(&self, overall: f64) -> DecisionBand {
        if overall >= self.auto_accept {
            DecisionBand::AutoAccept
        } else if overall >= self.monitor {
            DecisionBand::Monitor
        } else {
            DecisionBand::Review
        }
    }
}

/// Computes field and overall confidence
#[derive(Debug, Clone, Default)]
pub struct ConfidenceCalculator {
    config: ScoringConfig,
}

impl ConfidenceCalculator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score every field and combine with the given weights
    pub fn score(
        &self,
        fields: &ExtractedFields,
        body: &str,
        sender_matched: bool,
        weights: &ConfidenceWeights,
    ) -> ConfidenceScore {
        let mut breakdown = BTreeMap::new();
        breakdown.insert(Field::Sender, self.score_sender(sender_matched));
        breakdown.insert(Field::Amount, self.score_amount(fields, body));
        breakdown.insert(Field::Merchant, self.score_merchant(fields));
        breakdown.insert(Field::Date, score_date(fields));
        breakdown.insert(Field::Direction, score_direction(fields));
        breakdown.insert(Field::Reference, score_reference(fields));

        let overall = breakdown
            .iter()
            .map(|(field, conf)| conf.score * weights.weight(*field))
            .sum::<f64>();

        ConfidenceScore {
            overall: round_score(overall),
            breakdown,
        }
    }

    fn score_sender(&self, sender_matched: bool) -> FieldConfidence {
        FieldConfidence {
            extracted: sender_matched,
            score: if sender_matched { 1.0 } else { 0.0 },
            value: None,
        }
    }

    fn score_amount(&self, fields: &ExtractedFields, body: &str) -> FieldConfidence {
        let Some(amount) = &fields.amount else {
            // A token that looked like an amount but would not parse
            if let Some(raw) = &fields.malformed_amount {
                return FieldConfidence {
                    extracted: false,
                    score: 0.1,
                    value: Some(raw.clone()),
                };
            }
            return FieldConfidence::missing();
        };

        let mut score: f64 = 0.5;
        if has_decimal_precision(&amount.raw) {
            score += 0.2;
        }
        if char_offset(body, amount.offset) < self.config.amount_position_window {
            score += 0.2;
        }
        if (self.config.amount_min..=self.config.amount_max).contains(&amount.value) {
            score += 0.1;
        }

        FieldConfidence {
            extracted: true,
            score: round_score(score),
            value: Some(format!("{:.2}", amount.value)),
        }
    }

    fn score_merchant(&self, fields: &ExtractedFields) -> FieldConfidence {
        let Some(merchant) = &fields.merchant else {
            return FieldConfidence::missing();
        };
        let value = merchant.value.trim();
        let len = value.chars().count();

        if len < self.config.merchant_min_len {
            return FieldConfidence {
                extracted: true,
                score: 0.1,
                value: Some(value.to_string()),
            };
        }

        let mut score: f64 = 0.4;
        if len <= self.config.merchant_max_len {
            score += 0.2;
        }
        if value.chars().next().is_some_and(|c| c.is_uppercase()) {
            score += 0.1;
        }
        if self.contains_noise(value) {
            score -= 0.3;
        } else {
            score += 0.2;
        }
        if value.contains(' ') || value.chars().any(|c| c.is_lowercase()) {
            score += 0.1;
        }

        FieldConfidence {
            extracted: true,
            score: round_score(score),
            value: Some(value.to_string()),
        }
    }

    fn contains_noise(&self, value: &str) -> bool {
        let upper = value.to_uppercase();
        self.config
            .noise_keywords
            .iter()
            .any(|kw| contains_word(&upper, &kw.to_uppercase()))
    }
}

fn score_date(fields: &ExtractedFields) -> FieldConfidence {
    match &fields.date {
        Some(date) => FieldConfidence {
            extracted: true,
            score: 1.0,
            value: Some(date.value.format("%Y-%m-%d").to_string()),
        },
        None => FieldConfidence::missing(),
    }
}

fn score_direction(fields: &ExtractedFields) -> FieldConfidence {
    match &fields.direction {
        Some(m) => FieldConfidence {
            extracted: true,
            score: if m.ambiguous { 0.0 } else { 1.0 },
            value: Some(m.direction.as_str().to_string()),
        },
        None => FieldConfidence::missing(),
    }
}

/// Binary: a reference number is what separates alerts from promotions
fn score_reference(fields: &ExtractedFields) -> FieldConfidence {
    match &fields.reference {
        Some(reference) => FieldConfidence {
            extracted: true,
            score: 1.0,
            value: Some(reference.value.clone()),
        },
        None => FieldConfidence::missing(),
    }
}

/// Clamp to [0, 1] and drop float accumulation noise
fn round_score(score: f64) -> f64 {
    (score.clamp(0.0, 1.0) * 1e6).round() / 1e6
}

fn has_decimal_precision(raw: &str) -> bool {
    raw.rsplit_once('.')
        .is_some_and(|(_, frac)| !frac.is_empty() && frac.chars().all(|c| c.is_ascii_digit()))
}

/// Convert a byte offset to a character offset
fn char_offset(body: &str, byte_offset: usize) -> usize {
    body.get(..byte_offset)
        .map(|prefix| prefix.chars().count())
        .unwrap_or(byte_offset)
}

/// Whole-word containment on already-uppercased text
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, DirectionMatch, Extracted};
    use chrono::NaiveDate;

    fn full_fields(body: &str) -> ExtractedFields {
        ExtractedFields {
            amount: Some(Extracted {
                value: 250.0,
                raw: "250.00".into(),
                offset: body.find("250").unwrap(),
            }),
            merchant: Some(Extracted {
                value: "SWIGGY BANGALORE".into(),
                raw: "SWIGGY BANGALORE".into(),
                offset: body.find("SWIGGY").unwrap(),
            }),
            date: Some(Extracted {
                value: NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
                raw: "25-Dec-24".into(),
                offset: body.find("25-Dec").unwrap(),
            }),
            direction: Some(DirectionMatch {
                direction: Direction::Debit,
                offset: body.find("debited").unwrap(),
                ambiguous: false,
            }),
            reference: Some(Extracted {
                value: "123456789".into(),
                raw: "123456789".into(),
                offset: body.find("123456789").unwrap(),
            }),
            malformed_amount: None,
            malformed_date: None,
        }
    }

    const BODY: &str = "Alert: Rs.250.00 debited from A/c XX1234 at SWIGGY BANGALORE on 25-Dec-24. Ref: 123456789";

    #[test]
    fn test_perfect_message_scores_one() {
        let calc = ConfidenceCalculator::default();
        let score = calc.score(&full_fields(BODY), BODY, true, &ConfidenceWeights::default());
        assert!((score.overall - 1.0).abs() < 1e-9);
        assert_eq!(score.field(Field::Amount).unwrap().score, 1.0);
        assert_eq!(score.field(Field::Merchant).unwrap().score, 1.0);
    }

    #[test]
    fn test_fallback_sender_caps_overall() {
        let calc = ConfidenceCalculator::default();
        let weights = ConfidenceWeights::default();
        let score = calc.score(&full_fields(BODY), BODY, false, &weights);
        assert!((score.overall - (1.0 - weights.sender)).abs() < 1e-9);
    }

    #[test]
    fn test_amount_bonuses() {
        let calc = ConfidenceCalculator::default();
        let body = format!("{}Rs 250 spent", " ".repeat(60));
        let fields = ExtractedFields {
            amount: Some(Extracted {
                value: 250.0,
                raw: "250".into(),
                offset: body.find("250").unwrap(),
            }),
            ..Default::default()
        };
        let conf = calc.score_amount(&fields, &body);
        // base + magnitude only: no decimals, past the position window
        assert!((conf.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_amount_scores_point_one() {
        let calc = ConfidenceCalculator::default();
        let fields = ExtractedFields {
            malformed_amount: Some("1.2.3".into()),
            ..Default::default()
        };
        let conf = calc.score_amount(&fields, "Rs 1.2.3");
        assert!(!conf.extracted);
        assert_eq!(conf.score, 0.1);
    }

    #[test]
    fn test_merchant_noise_penalty() {
        let calc = ConfidenceCalculator::default();
        let fields = ExtractedFields {
            merchant: Some(Extracted {
                value: "CASHBACK OFFER".into(),
                raw: "CASHBACK OFFER".into(),
                offset: 0,
            }),
            ..Default::default()
        };
        let conf = calc.score_merchant(&fields);
        // 0.4 + 0.2 length + 0.1 uppercase - 0.3 noise + 0.1 space
        assert!((conf.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_short_merchant_forced_low() {
        let calc = ConfidenceCalculator::default();
        let fields = ExtractedFields {
            merchant: Some(Extracted {
                value: "AB".into(),
                raw: "AB".into(),
                offset: 0,
            }),
            ..Default::default()
        };
        assert_eq!(calc.score_merchant(&fields).score, 0.1);
    }

    #[test]
    fn test_ambiguous_direction_scores_zero() {
        let fields = ExtractedFields {
            direction: Some(DirectionMatch {
                direction: Direction::Debit,
                offset: 0,
                ambiguous: true,
            }),
            ..Default::default()
        };
        let conf = score_direction(&fields);
        assert!(conf.extracted);
        assert_eq!(conf.score, 0.0);
    }

    #[test]
    fn test_overall_is_clamped() {
        let calc = ConfidenceCalculator::default();
        // Deliberately over-weighted; overall must still be within [0, 1]
        let weights = ConfidenceWeights {
            sender: 1.0,
            amount: 1.0,
            merchant: 1.0,
            date: 1.0,
            reference: 1.0,
        };
        let score = calc.score(&full_fields(BODY), BODY, true, &weights);
        assert_eq!(score.overall, 1.0);

        let empty = calc.score(&ExtractedFields::default(), "", false, &weights);
        assert_eq!(empty.overall, 0.0);
    }

    #[test]
    fn test_weights_validation() {
        assert!(ConfidenceWeights::default().validate().is_ok());
        let bad = ConfidenceWeights {
            sender: 0.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_bands() {
        let bands = BandThresholds::default();
        assert_eq!(bands.band(0.9), DecisionBand::AutoAccept);
        assert_eq!(bands.band(0.85), DecisionBand::AutoAccept);
        assert_eq!(bands.band(0.6), DecisionBand::Monitor);
        assert_eq!(bands.band(0.49), DecisionBand::Review);
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("BIG WIN TODAY", "WIN"));
        assert!(!contains_word("WINDSOR CAFE", "WIN"));
    }
}
