//! Shared command utilities

use std::path::Path;

use anyhow::{Context, Result};
use paisa_core::{CandidateTransaction, Field, ParseResult, Pipeline, ReviewStatus, RuleCatalog};

use super::truncate;

/// Load the rule catalog and build a pipeline
///
/// A catalog that fails to load aborts the command; nothing can be parsed
/// without it.
pub fn load_pipeline(rules: Option<&Path>) -> Result<Pipeline> {
    let catalog = RuleCatalog::load(rules).context("Failed to load rule catalog")?;
    Ok(Pipeline::new(catalog))
}

/// Human-readable rendering of a parse result
pub fn print_result(result: &ParseResult) {
    match result {
        ParseResult::Success(candidate) => print_candidate(candidate),
        ParseResult::Rejected(reason) => println!("🚫 Rejected: {}", reason),
    }
}

fn print_candidate(c: &CandidateTransaction) {
    let icon = match c.status {
        ReviewStatus::Accepted => "✅",
        ReviewStatus::Monitored => "👀",
        ReviewStatus::NeedsReview => "📝",
    };
    let direction = if c.is_debit { "debit" } else { "credit" };

    println!("{} {} ({:.0}% confidence)", icon, c.status, c.confidence.overall * 100.0);
    println!("   Amount:     ₹{:.2} {}", c.amount, direction);
    println!(
        "   Merchant:   {} (raw: {})",
        c.normalized_merchant,
        if c.raw_merchant.is_empty() { "-" } else { c.raw_merchant.as_str() }
    );
    println!("   Bank:       {} [{}]", c.bank_name, c.rule_code);
    println!("   Date:       {}", c.transaction_date);
    println!(
        "   Reference:  {}",
        c.reference_number.as_deref().unwrap_or("-")
    );
    println!("   Dedup key:  {}", c.dedup_key);
    println!("   SMS hash:   {}", truncate(&c.source_id, 19));

    println!("   Breakdown:");
    for field in Field::all() {
        if let Some(conf) = c.confidence.field(*field) {
            println!(
                "     {:<10} {:>4.2}  {}",
                field.as_str(),
                conf.score,
                conf.value.as_deref().unwrap_or("-")
            );
        }
    }
}
