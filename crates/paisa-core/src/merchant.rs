//! Merchant name canonicalization
//!
//! `normalize_merchant` produces the identity key used for aggregation and
//! deduplication. `grouping_key` is a more aggressive variant that also drops
//! city names; it only feeds grouping suggestions and never replaces the
//! identity key, since distinct merchants in the same city would otherwise merge.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Trailing order/payment markers: "SWIGGY*ORDER9182" -> "SWIGGY"
static MARKER_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\*\s*(?:ORDER|PAYMENT|TXN|TRANSACTION).*$").expect("valid regex")
});

/// Trailing store/terminal numbers: "H-E-B #123" -> "H-E-B"
static HASH_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*#\d.*$").expect("valid regex"));

/// Trailing UPI handles: "SWIGGY@AXISBANK" -> "SWIGGY"
static HANDLE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*@\S.*$").expect("valid regex"));

/// Runs of separators and everything after: "ZOMATO--BLR" -> "ZOMATO"
static SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[-_]{2,}.*$").expect("valid regex"));

static CORPORATE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\s+(?:PVT\.?\s*LTD|PRIVATE\s+LIMITED|LTD|LIMITED|LLC|INC|CORP)\.?$",
    )
    .expect("valid regex")
});

/// Cities stripped by `grouping_key` only
const KNOWN_CITIES: &[&str] = &[
    "NEW DELHI",
    "NAVI MUMBAI",
    "BANGALORE",
    "BENGALURU",
    "MUMBAI",
    "DELHI",
    "GURGAON",
    "GURUGRAM",
    "NOIDA",
    "CHENNAI",
    "HYDERABAD",
    "KOLKATA",
    "PUNE",
    "AHMEDABAD",
    "JAIPUR",
    "LUCKNOW",
    "KOCHI",
    "CHANDIGARH",
    "INDORE",
    "BHOPAL",
    "IND",
    "IN",
];

/// Canonical merchant identity for a raw merchant string
///
/// Steps run in a fixed order: uppercase, collapse whitespace, strip order
/// markers, `#<digits>` tails, `@handle` tails, separator runs, corporate
/// suffixes, trim. The function is pure and idempotent.
pub fn normalize_merchant(raw: &str) -> String {
    let collapsed = raw.to_uppercase().split_whitespace().collect::<Vec<_>>().join(" ");

    let mut name = MARKER_SUFFIX.replace(&collapsed, "").into_owned();
    name = HASH_SUFFIX.replace(&name, "").into_owned();
    name = HANDLE_SUFFIX.replace(&name, "").into_owned();
    name = SEPARATOR_RUN.replace(&name, "").into_owned();

    // "ACME INDIA PVT LTD INC" needs more than one pass
    loop {
        let stripped = CORPORATE_SUFFIX.replace(&name, "");
        if stripped.len() == name.len() {
            break;
        }
        name = stripped.into_owned();
    }

    let name = name.trim();
    if name.is_empty() {
        collapsed
    } else {
        name.to_string()
    }
}

/// Aggressive key for grouping suggestions: normalized name without city names
pub fn grouping_key(raw: &str) -> String {
    let normalized = normalize_merchant(raw);
    let mut words: Vec<&str> = normalized.split(' ').collect();

    // Strip trailing city names, longest first so "NEW DELHI" beats "DELHI"
    let mut changed = true;
    while changed && words.len() > 1 {
        changed = false;
        for city in KNOWN_CITIES {
            let city_words: Vec<&str> = city.split(' ').collect();
            if words.len() > city_words.len() && words.ends_with(&city_words) {
                words.truncate(words.len() - city_words.len());
                changed = true;
                break;
            }
        }
    }

    words.join(" ")
}

/// Explicit alias: normalized names matching `pattern` belong to `canonical`
#[derive(Debug, Clone)]
pub struct MerchantAlias {
    pub pattern: Regex,
    pub canonical: String,
}

impl MerchantAlias {
    pub fn matches(&self, normalized: &str) -> bool {
        self.pattern.is_match(normalized)
    }
}

/// Suggested merger of distinct normalized merchant names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSuggestion {
    pub key: String,
    pub members: Vec<String>,
}

/// Collects normalized merchant names and proposes groupings
#[derive(Debug, Default)]
pub struct MerchantGrouper {
    aliases: Vec<MerchantAlias>,
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl MerchantGrouper {
    pub fn new(aliases: Vec<MerchantAlias>) -> Self {
        Self {
            aliases,
            groups: BTreeMap::new(),
        }
    }

    /// Record a merchant; accepts raw or already-normalized names
    pub fn add(&mut self, merchant: &str) {
        let normalized = normalize_merchant(merchant);
        let key = self.key_for(&normalized);
        self.groups.entry(key).or_default().insert(normalized);
    }

    fn key_for(&self, normalized: &str) -> String {
        self.aliases
            .iter()
            .find(|alias| alias.matches(normalized))
            .map(|alias| alias.canonical.clone())
            .unwrap_or_else(|| grouping_key(normalized))
    }

    /// Groups with at least two distinct normalized names, ordered by key
    pub fn suggestions(&self) -> Vec<GroupSuggestion> {
        self.groups
            .iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(key, members)| GroupSuggestion {
                key: key.clone(),
                members: members.iter().cloned().collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_order_marker() {
        assert_eq!(normalize_merchant("SWIGGY*ORDER9182"), "SWIGGY");
        assert_eq!(normalize_merchant("Zomato*Payment 55"), "ZOMATO");
        assert_eq!(normalize_merchant("UBER * TXN 991"), "UBER");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_merchant("Swiggy   Bangalore"), "SWIGGY BANGALORE");
        assert_eq!(normalize_merchant("  big\tbasket  "), "BIG BASKET");
    }

    #[test]
    fn test_normalize_hash_handle_and_separators() {
        assert_eq!(normalize_merchant("DMART #0042 THANE"), "DMART");
        assert_eq!(normalize_merchant("swiggy@axisbank"), "SWIGGY");
        assert_eq!(normalize_merchant("ZOMATO--BLR--991"), "ZOMATO");
        assert_eq!(normalize_merchant("BOOKMYSHOW__WEB"), "BOOKMYSHOW");
    }

    #[test]
    fn test_normalize_corporate_suffixes() {
        assert_eq!(normalize_merchant("Reliance Retail Ltd"), "RELIANCE RETAIL");
        assert_eq!(normalize_merchant("ACME INDIA PVT LTD"), "ACME INDIA");
        assert_eq!(normalize_merchant("Acme Private Limited"), "ACME");
        assert_eq!(normalize_merchant("Stripe Inc."), "STRIPE");
        assert_eq!(normalize_merchant("FOO LLC CORP"), "FOO");
    }

    #[test]
    fn test_normalize_never_empty() {
        assert_eq!(normalize_merchant("@paytm"), "@PAYTM");
        assert_eq!(normalize_merchant("LTD"), "LTD");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "SWIGGY*ORDER9182",
            "Swiggy   Bangalore",
            "ACME INDIA PVT LTD LTD",
            "@paytm",
            "dmart #12 ltd",
            "FOO -- BAR LTD",
            "Café Coffee Day",
            "",
        ];
        for raw in samples {
            let once = normalize_merchant(raw);
            assert_eq!(normalize_merchant(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_grouping_key_strips_cities() {
        assert_eq!(grouping_key("Swiggy   Bangalore"), "SWIGGY");
        assert_eq!(grouping_key("SWIGGY*ORDER9182"), "SWIGGY");
        assert_eq!(grouping_key("Haldiram New Delhi"), "HALDIRAM");
        // A bare city name is kept rather than emptied
        assert_eq!(grouping_key("Bangalore"), "BANGALORE");
    }

    #[test]
    fn test_grouping_does_not_change_identity() {
        assert_ne!(
            normalize_merchant("Swiggy Bangalore"),
            normalize_merchant("Swiggy Mumbai")
        );
        assert_eq!(grouping_key("Swiggy Bangalore"), grouping_key("Swiggy Mumbai"));
    }

    #[test]
    fn test_grouper_suggestions() {
        let aliases = vec![MerchantAlias {
            pattern: Regex::new(r"^(?:AMZN|AMAZON\S*)\b").unwrap(),
            canonical: "AMAZON".to_string(),
        }];
        let mut grouper = MerchantGrouper::new(aliases);
        grouper.add("Swiggy Bangalore");
        grouper.add("SWIGGY MUMBAI");
        grouper.add("SWIGGY*ORDER9182");
        grouper.add("AMZN Mktp");
        grouper.add("Amazon.in");
        grouper.add("DMART");

        let suggestions = grouper.suggestions();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].key, "AMAZON");
        assert_eq!(suggestions[0].members, vec!["AMAZON.IN", "AMZN MKTP"]);
        assert_eq!(suggestions[1].key, "SWIGGY");
        assert_eq!(
            suggestions[1].members,
            vec!["SWIGGY", "SWIGGY BANGALORE", "SWIGGY MUMBAI"]
        );
    }
}
