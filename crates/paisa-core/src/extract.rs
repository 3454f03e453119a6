//! Field extraction
//!
//! Applies a rule's patterns to the message body. For each field the patterns
//! are tried in declared order and every match of a pattern is considered; the
//! first candidate passing the sanity filter wins. Plausibility beyond the
//! sanity filter is left to the confidence calculator.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::models::{Direction, DirectionMatch, Extracted, ExtractedFields};
use crate::rules::{BankRule, DirectionPatterns};

/// Formats tried for tokens ending in a two-digit year
const SHORT_YEAR_FORMATS: &[&str] = &[
    "%d-%b-%y", "%d/%m/%y", "%d-%m-%y", "%d %b %y", "%d%b%y", "%d/%b/%y", "%d %m %y",
];

/// Formats tried for tokens ending in a four-digit year
const LONG_YEAR_FORMATS: &[&str] = &[
    "%d-%b-%Y", "%d/%m/%Y", "%d-%m-%Y", "%d %b %Y", "%d%b%Y", "%d/%b/%Y", "%d %m %Y",
];

/// Minimum length of a reference number
const MIN_REFERENCE_LEN: usize = 4;

/// Minimum length of a merchant value
const MIN_MERCHANT_LEN: usize = 3;

/// "A/c XX1234", "your account", "Card ending 4321"
static ACCOUNT_LEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:your|ur|my)\s+)?(?:a/c|acct|account|card)\b").expect("valid regex")
});

/// A masked account number anywhere in the value
static MASKED_ACCOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:a/c|acct|account)\.?\s*(?:no\.?\s*)?[x*]+\d+").expect("valid regex")
});

/// Extracts raw field values using one rule
#[derive(Debug, Clone, Copy)]
pub struct FieldExtractor<'a> {
    rule: &'a BankRule,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(rule: &'a BankRule) -> Self {
        Self { rule }
    }

    pub fn extract(&self, body: &str) -> ExtractedFields {
        let (amount, malformed_amount) =
            first_valid(&self.rule.amount_patterns, "amount", body, parse_amount);
        let (merchant, _) =
            first_valid(&self.rule.merchant_patterns, "merchant", body, sanitize_merchant);
        let (date, malformed_date) = first_valid(&self.rule.date_patterns, "date", body, parse_date);
        let (reference, _) = first_valid(
            &self.rule.reference_patterns,
            "reference",
            body,
            sanitize_reference,
        );

        // A rejected token only matters when no candidate survived
        let malformed_amount = malformed_amount.filter(|_| amount.is_none());
        let malformed_date = malformed_date.filter(|_| date.is_none());
        if let Some(raw) = &malformed_amount {
            warn!(rule = %self.rule.code, token = %raw, "Unparseable amount token");
        }
        if let Some(raw) = &malformed_date {
            warn!(rule = %self.rule.code, token = %raw, "Unparseable date token");
        }

        ExtractedFields {
            amount,
            merchant,
            date,
            direction: resolve_direction(&self.rule.direction_patterns, body),
            reference,
            malformed_amount,
            malformed_date,
        }
    }
}

/// Scan every match of every pattern; return the first value accepted by
/// `accept` and the first token that matched but was rejected
fn first_valid<T>(
    patterns: &[Regex],
    group: &str,
    body: &str,
    accept: impl Fn(&str) -> Option<T>,
) -> (Option<Extracted<T>>, Option<String>) {
    let mut rejected = None;
    for pattern in patterns {
        for caps in pattern.captures_iter(body) {
            let Some(m) = caps.name(group) else {
                continue;
            };
            match accept(m.as_str()) {
                Some(value) => {
                    return (
                        Some(Extracted {
                            value,
                            raw: m.as_str().to_string(),
                            offset: m.start(),
                        }),
                        rejected,
                    );
                }
                None => {
                    if rejected.is_none() {
                        rejected = Some(m.as_str().to_string());
                    }
                }
            }
        }
    }
    (None, rejected)
}

/// Parse an amount token such as "5,00,000" or "250.00"
pub fn parse_amount(token: &str) -> Option<f64> {
    let cleaned: String = token.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Parse a date token; the year width picks the format family
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    let leading_digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
    if leading_digits == 4 {
        return NaiveDate::parse_from_str(token, "%Y-%m-%d").ok();
    }

    let year_digits = token
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .count();
    let formats = match year_digits {
        2 => SHORT_YEAR_FORMATS,
        4 => LONG_YEAR_FORMATS,
        _ => return None,
    };
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

fn sanitize_merchant(raw: &str) -> Option<String> {
    let value = raw
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ':' | ';' | '-') || c.is_whitespace());

    if value.chars().count() < MIN_MERCHANT_LEN {
        return None;
    }
    if value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | ' '))
    {
        return None;
    }

    // "to your a/c XX1234" names an account, not a merchant
    if ACCOUNT_LEAD.is_match(value) || MASKED_ACCOUNT.is_match(value) {
        return None;
    }

    Some(value.to_string())
}

fn sanitize_reference(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.len() >= MIN_REFERENCE_LEN && value.chars().any(|c| c.is_ascii_digit()) {
        Some(value.to_string())
    } else {
        None
    }
}

fn earliest(patterns: &[Regex], body: &str) -> Option<usize> {
    patterns
        .iter()
        .filter_map(|p| p.find(body).map(|m| m.start()))
        .min()
}

/// The earlier phrase wins; both present marks the match ambiguous
fn resolve_direction(patterns: &DirectionPatterns, body: &str) -> Option<DirectionMatch> {
    let debit = earliest(&patterns.debit, body);
    let credit = earliest(&patterns.credit, body);

    match (debit, credit) {
        (Some(d), Some(c)) => Some(DirectionMatch {
            direction: if d <= c { Direction::Debit } else { Direction::Credit },
            offset: d.min(c),
            ambiguous: true,
        }),
        (Some(d), None) => Some(DirectionMatch {
            direction: Direction::Debit,
            offset: d,
            ambiguous: false,
        }),
        (None, Some(c)) => Some(DirectionMatch {
            direction: Direction::Credit,
            offset: c,
            ambiguous: false,
        }),
        (None, None) => None,
    }
}
