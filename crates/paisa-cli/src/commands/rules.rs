//! Rule catalog commands

use std::path::Path;

use anyhow::{Context, Result};
use paisa_core::{BankRule, RuleCatalog};

pub fn cmd_rules_list(rules: Option<&Path>) -> Result<()> {
    let catalog = RuleCatalog::load(rules).context("Failed to load rule catalog")?;
    let config = catalog.pipeline_config();

    println!("📋 Rule catalog ({})", catalog.origin());
    println!(
        "   Thresholds: auto-accept ≥ {:.2}, monitor ≥ {:.2}, review floor {:.2}",
        config.auto_accept_threshold, config.monitor_threshold, config.review_floor
    );
    println!();
    println!(
        "{:<10} {:<24} {:>8}  {}",
        "CODE", "BANK", "PRIORITY", "SENDERS"
    );
    println!("{}", "-".repeat(70));
    for rule in catalog.rules() {
        print_rule(rule);
    }
    println!(
        "{:<10} {:<24} {:>8}  (any unmatched sender)",
        catalog.fallback().code,
        "-",
        "-"
    );

    if !catalog.aliases().is_empty() {
        println!("\n🔗 Merchant aliases:");
        for alias in catalog.aliases() {
            println!("   {} ← {}", alias.canonical, alias.pattern.as_str());
        }
    }
    Ok(())
}

fn print_rule(rule: &BankRule) {
    let senders: Vec<String> = rule.sender_patterns.iter().map(|p| p.to_string()).collect();
    println!(
        "{:<10} {:<24} {:>8}  {}",
        rule.code,
        super::truncate(&rule.bank_name, 24),
        rule.priority,
        senders.join(", ")
    );
}

pub fn cmd_rules_check(path: &Path) -> Result<()> {
    let catalog = RuleCatalog::from_file(path)
        .with_context(|| format!("Invalid rule catalog: {}", path.display()))?;
    println!(
        "✅ {} is valid: {} rules, {} aliases",
        path.display(),
        catalog.rules().len(),
        catalog.aliases().len()
    );
    Ok(())
}
