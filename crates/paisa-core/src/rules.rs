//! Rule catalog: per-provider sender patterns, field patterns and weights
//!
//! The catalog is loaded once at startup and is immutable afterwards.
//!
//! ## Configuration Resolution
//!
//! The catalog is loaded with a three-layer resolution:
//! 1. An explicit path (e.g. `paisa --rules my-rules.toml`)
//! 2. Override in data dir (~/.local/share/paisa/config/rules.toml)
//! 3. Embedded default (compiled into binary)
//!
//! Any invalid pattern, weight or missing section aborts loading. The pipeline
//! cannot run without a catalog, so this is the only fatal error path.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::info;

use crate::confidence::{ConfidenceWeights, ScoringConfig};
use crate::error::{Error, Result};
use crate::merchant::MerchantAlias;
use crate::pipeline::PipelineConfig;

/// Embedded default catalog (compiled into binary)
pub const DEFAULT_CATALOG: &str = include_str!("../../../config/rules.toml");

/// Rule code used for the generic fallback
pub const GENERIC_RULE_CODE: &str = "GENERIC";

/// How a sender pattern matches, most specific first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SenderMatchKind {
    Exact,
    Prefix,
    Regex,
}

/// A single sender pattern from the catalog
#[derive(Debug, Clone)]
pub enum SenderPattern {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

impl SenderPattern {
    /// Parse `"HDFCBK"`, `"HDFC*"` or `"re:<regex>"`
    pub fn parse(rule: &str, pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if let Some(re) = pattern.strip_prefix("re:") {
            let regex = RegexBuilder::new(re)
                .case_insensitive(true)
                .build()
                .map_err(|source| Error::InvalidPattern {
                    rule: rule.to_string(),
                    pattern: pattern.to_string(),
                    source,
                })?;
            return Ok(Self::Regex(regex));
        }
        if pattern.is_empty() || pattern == "*" {
            return Err(Error::RuleCatalog(format!(
                "rule {} has an empty sender pattern",
                rule
            )));
        }
        if let Some(prefix) = pattern.strip_suffix('*') {
            return Ok(Self::Prefix(prefix.to_uppercase()));
        }
        Ok(Self::Exact(pattern.to_uppercase()))
    }

    pub fn kind(&self) -> SenderMatchKind {
        match self {
            Self::Exact(_) => SenderMatchKind::Exact,
            Self::Prefix(_) => SenderMatchKind::Prefix,
            Self::Regex(_) => SenderMatchKind::Regex,
        }
    }

    /// Match against an already-normalized (uppercased) sender header
    pub fn matches(&self, sender: &str) -> bool {
        match self {
            Self::Exact(s) => sender == s,
            Self::Prefix(p) => sender.starts_with(p.as_str()),
            Self::Regex(re) => re.is_match(sender),
        }
    }
}

impl std::fmt::Display for SenderPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "{}", s),
            Self::Prefix(p) => write!(f, "{}*", p),
            Self::Regex(re) => write!(f, "re:{}", re.as_str()),
        }
    }
}

/// Debit and credit phrase patterns
#[derive(Debug, Clone)]
pub struct DirectionPatterns {
    pub debit: Vec<Regex>,
    pub credit: Vec<Regex>,
}

/// Extraction rule for one bank or payment aggregator
#[derive(Debug, Clone)]
pub struct BankRule {
    pub code: String,
    pub bank_name: String,
    /// Higher priority rules are tried first within a specificity tier
    pub priority: i32,
    pub sender_patterns: Vec<SenderPattern>,
    pub amount_patterns: Vec<Regex>,
    pub merchant_patterns: Vec<Regex>,
    pub date_patterns: Vec<Regex>,
    pub direction_patterns: DirectionPatterns,
    pub reference_patterns: Vec<Regex>,
    pub weights: ConfidenceWeights,
}

impl BankRule {
    pub fn is_fallback(&self) -> bool {
        self.code == GENERIC_RULE_CODE
    }
}

/// Heuristics for recognising bank-like senders that match no rule
#[derive(Debug, Clone)]
pub struct SenderHeuristics {
    pub short_code: Option<Regex>,
    pub bank_keywords: Vec<String>,
    pub aggregator_aliases: Vec<String>,
}

impl SenderHeuristics {
    /// Known numeric short code, bank-name substring or aggregator alias
    pub fn is_bank_like(&self, sender: &str) -> bool {
        if self.short_code.as_ref().is_some_and(|re| re.is_match(sender)) {
            return true;
        }
        self.bank_keywords
            .iter()
            .chain(self.aggregator_aliases.iter())
            .any(|kw| sender.contains(kw.as_str()))
    }
}

/// Where the catalog came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOrigin {
    Embedded,
    File(PathBuf),
}

impl std::fmt::Display for CatalogOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded => write!(f, "embedded default"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Immutable set of rules plus pipeline tuning
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    /// Bank rules sorted by descending priority, declaration order preserved on ties
    rules: Vec<BankRule>,
    fallback: BankRule,
    heuristics: SenderHeuristics,
    default_weights: ConfidenceWeights,
    pipeline: PipelineConfig,
    scoring: ScoringConfig,
    aliases: Vec<MerchantAlias>,
    origin: CatalogOrigin,
}

impl RuleCatalog {
    /// Load using the resolution order described in the module docs
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = default_catalog_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Self::embedded()
    }

    /// The catalog compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(DEFAULT_CATALOG, CatalogOrigin::Embedded)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::RuleCatalog(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content, CatalogOrigin::File(path.to_path_buf()))
    }

    pub fn from_toml_str(content: &str, origin: CatalogOrigin) -> Result<Self> {
        let raw: RawCatalog = toml::from_str(content)?;
        let catalog = compile(raw, origin)?;
        info!(
            "Loaded {} rules from {}",
            catalog.rules.len(),
            catalog.origin
        );
        Ok(catalog)
    }

    /// Bank rules in match order
    pub fn rules(&self) -> &[BankRule] {
        &self.rules
    }

    pub fn rule(&self, code: &str) -> Option<&BankRule> {
        self.rules.iter().find(|r| r.code.eq_ignore_ascii_case(code))
    }

    pub fn fallback(&self) -> &BankRule {
        &self.fallback
    }

    pub fn heuristics(&self) -> &SenderHeuristics {
        &self.heuristics
    }

    /// Weights applied when a rule does not declare its own
    pub fn default_weights(&self) -> &ConfidenceWeights {
        &self.default_weights
    }

    pub fn pipeline_config(&self) -> &PipelineConfig {
        &self.pipeline
    }

    pub fn scoring_config(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn aliases(&self) -> &[MerchantAlias] {
        &self.aliases
    }

    pub fn origin(&self) -> &CatalogOrigin {
        &self.origin
    }
}

/// Default catalog override path
pub fn default_catalog_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("paisa").join("config").join("rules.toml"))
}

/// Raw catalog structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    pipeline: PipelineConfig,
    #[serde(default)]
    scoring: ScoringConfig,
    weights: Option<ConfidenceWeights>,
    generic: RawGeneric,
    #[serde(default)]
    rules: Vec<RawRule>,
    #[serde(default)]
    aliases: Vec<RawAlias>,
}

#[derive(Debug, Deserialize)]
struct RawGeneric {
    short_code_pattern: Option<String>,
    #[serde(default)]
    bank_keywords: Vec<String>,
    #[serde(default)]
    aggregator_aliases: Vec<String>,
    #[serde(flatten)]
    patterns: RawPatterns,
    weights: Option<ConfidenceWeights>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPatterns {
    amount_patterns: Option<Vec<String>>,
    merchant_patterns: Option<Vec<String>>,
    date_patterns: Option<Vec<String>>,
    debit_patterns: Option<Vec<String>>,
    credit_patterns: Option<Vec<String>>,
    reference_patterns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    code: String,
    bank_name: String,
    #[serde(default)]
    priority: i32,
    sender_patterns: Vec<String>,
    #[serde(flatten)]
    patterns: RawPatterns,
    weights: Option<ConfidenceWeights>,
}

#[derive(Debug, Deserialize)]
struct RawAlias {
    pattern: String,
    canonical: String,
}

/// Fully resolved pattern source lists for one rule
struct PatternSources<'a> {
    amount: &'a [String],
    merchant: &'a [String],
    date: &'a [String],
    debit: &'a [String],
    credit: &'a [String],
    reference: &'a [String],
}

fn compile(raw: RawCatalog, origin: CatalogOrigin) -> Result<RuleCatalog> {
    raw.pipeline.validate()?;

    let default_weights = raw.weights.unwrap_or_default();
    default_weights
        .validate()
        .map_err(|e| Error::RuleCatalog(format!("[weights]: {}", e)))?;

    let generic = &raw.generic.patterns;
    let generic_sources = PatternSources {
        amount: required(&generic.amount_patterns, "amount_patterns")?,
        merchant: required(&generic.merchant_patterns, "merchant_patterns")?,
        date: required(&generic.date_patterns, "date_patterns")?,
        debit: required(&generic.debit_patterns, "debit_patterns")?,
        credit: required(&generic.credit_patterns, "credit_patterns")?,
        reference: required(&generic.reference_patterns, "reference_patterns")?,
    };

    let fallback_weights = raw.generic.weights.unwrap_or(default_weights);
    let fallback = compile_rule(
        GENERIC_RULE_CODE,
        "Unknown sender",
        i32::MIN,
        Vec::new(),
        &generic_sources,
        fallback_weights,
    )?;

    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(raw.rules.len());
    for rule in &raw.rules {
        let code = rule.code.trim().to_uppercase();
        if code.is_empty() || code == GENERIC_RULE_CODE {
            return Err(Error::RuleCatalog(format!(
                "invalid rule code '{}'",
                rule.code
            )));
        }
        if !seen.insert(code.clone()) {
            return Err(Error::RuleCatalog(format!("duplicate rule code {}", code)));
        }
        if rule.sender_patterns.is_empty() {
            return Err(Error::RuleCatalog(format!(
                "rule {} has no sender patterns",
                code
            )));
        }

        let sender_patterns = rule
            .sender_patterns
            .iter()
            .map(|p| SenderPattern::parse(&code, p))
            .collect::<Result<Vec<_>>>()?;

        let p = &rule.patterns;
        let sources = PatternSources {
            amount: p.amount_patterns.as_deref().unwrap_or(generic_sources.amount),
            merchant: p.merchant_patterns.as_deref().unwrap_or(generic_sources.merchant),
            date: p.date_patterns.as_deref().unwrap_or(generic_sources.date),
            debit: p.debit_patterns.as_deref().unwrap_or(generic_sources.debit),
            credit: p.credit_patterns.as_deref().unwrap_or(generic_sources.credit),
            reference: p
                .reference_patterns
                .as_deref()
                .unwrap_or(generic_sources.reference),
        };

        rules.push(compile_rule(
            &code,
            rule.bank_name.trim(),
            rule.priority,
            sender_patterns,
            &sources,
            rule.weights.unwrap_or(default_weights),
        )?);
    }

    // Stable sort keeps declaration order among equal priorities
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));

    let short_code = raw
        .generic
        .short_code_pattern
        .as_deref()
        .map(|p| compile_pattern(GENERIC_RULE_CODE, p, None))
        .transpose()?;
    let heuristics = SenderHeuristics {
        short_code,
        bank_keywords: upper_all(&raw.generic.bank_keywords),
        aggregator_aliases: upper_all(&raw.generic.aggregator_aliases),
    };

    let aliases = raw
        .aliases
        .iter()
        .map(|a| {
            Ok(MerchantAlias {
                pattern: compile_pattern("aliases", &a.pattern, None)?,
                canonical: a.canonical.trim().to_uppercase(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RuleCatalog {
        rules,
        fallback,
        heuristics,
        default_weights,
        pipeline: raw.pipeline,
        scoring: raw.scoring,
        aliases,
        origin,
    })
}

fn compile_rule(
    code: &str,
    bank_name: &str,
    priority: i32,
    sender_patterns: Vec<SenderPattern>,
    sources: &PatternSources<'_>,
    weights: ConfidenceWeights,
) -> Result<BankRule> {
    weights
        .validate()
        .map_err(|e| Error::RuleCatalog(format!("rule {}: {}", code, e)))?;
    if bank_name.is_empty() {
        return Err(Error::RuleCatalog(format!("rule {} has no bank_name", code)));
    }

    Ok(BankRule {
        code: code.to_string(),
        bank_name: bank_name.to_string(),
        priority,
        sender_patterns,
        amount_patterns: compile_all(code, sources.amount, Some("amount"))?,
        merchant_patterns: compile_all(code, sources.merchant, Some("merchant"))?,
        date_patterns: compile_all(code, sources.date, Some("date"))?,
        direction_patterns: DirectionPatterns {
            debit: compile_all(code, sources.debit, None)?,
            credit: compile_all(code, sources.credit, None)?,
        },
        reference_patterns: compile_all(code, sources.reference, Some("reference"))?,
        weights,
    })
}

fn compile_all(code: &str, patterns: &[String], group: Option<&str>) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| compile_pattern(code, p, group))
        .collect()
}

/// Compile a pattern and check it exposes the named capture group
fn compile_pattern(code: &str, pattern: &str, group: Option<&str>) -> Result<Regex> {
    let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
        rule: code.to_string(),
        pattern: pattern.to_string(),
        source,
    })?;
    if let Some(group) = group {
        if !regex.capture_names().any(|name| name == Some(group)) {
            return Err(Error::RuleCatalog(format!(
                "rule {}: pattern '{}' has no (?P<{}>...) group",
                code, pattern, group
            )));
        }
    }
    Ok(regex)
}

fn required<'a>(list: &'a Option<Vec<String>>, name: &str) -> Result<&'a [String]> {
    match list.as_deref() {
        Some(patterns) if !patterns.is_empty() => Ok(patterns),
        _ => Err(Error::RuleCatalog(format!("[generic] is missing {}", name))),
    }
}

fn upper_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_uppercase())
        .filter(|v| !v.is_empty())
        .collect()
}
