//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Paisa - Turn bank SMS alerts into transactions
#[derive(Parser)]
#[command(name = "paisa")]
#[command(about = "Parse bank and payment-app SMS alerts into structured transactions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Rule catalog path (defaults to the data dir override, then the built-in catalog)
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a single SMS (live path)
    Parse {
        /// Sender address, e.g. VM-HDFCBK
        #[arg(short, long)]
        from: String,

        /// Message body
        #[arg(short, long)]
        body: String,

        /// Delivery time in milliseconds since the epoch (defaults to now)
        #[arg(short, long)]
        timestamp: Option<i64>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan an SMS export (bulk path)
    Scan {
        /// CSV (address,body,date) or JSON-lines export
        #[arg(short, long)]
        file: PathBuf,

        /// Input format
        #[arg(long, value_enum, default_value = "auto")]
        format: InputFormat,

        /// Only process messages newer than this sync cursor (millis)
        #[arg(long)]
        since: Option<i64>,

        /// Write retained transactions as JSON lines
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print merchant grouping suggestions
        #[arg(long)]
        groups: bool,
    },

    /// Show or validate the rule catalog
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Normalize a merchant name
    Normalize {
        /// Raw merchant text
        merchant: String,

        /// Also show the grouping key (strips city names)
        #[arg(long)]
        grouping: bool,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules in match order
    List,
    /// Validate a catalog file without using it
    Check {
        /// Catalog TOML file
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Pick by file extension (.csv, otherwise JSON lines)
    Auto,
    Csv,
    Jsonl,
}
