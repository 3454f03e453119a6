//! Paisa CLI - SMS transaction parser
//!
//! Usage:
//!   paisa parse --from VM-HDFCBK --body "..."   Parse one SMS (live path)
//!   paisa scan --file sms.csv                    Scan an SMS export (bulk path)
//!   paisa rules                                  List the rule catalog
//!   paisa normalize "SWIGGY*ORDER9182"           Normalize a merchant name

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Parse {
            from,
            body,
            timestamp,
            json,
        } => {
            let pipeline = commands::load_pipeline(cli.rules.as_deref())?;
            commands::cmd_parse(pipeline, &from, &body, timestamp, json).await
        }
        Commands::Scan {
            file,
            format,
            since,
            output,
            groups,
        } => {
            let pipeline = commands::load_pipeline(cli.rules.as_deref())?;
            commands::cmd_scan(&pipeline, &file, format, since, output.as_deref(), groups).await
        }
        Commands::Rules { action } => match action {
            None | Some(RulesAction::List) => commands::cmd_rules_list(cli.rules.as_deref()),
            Some(RulesAction::Check { path }) => commands::cmd_rules_check(&path),
        },
        Commands::Normalize { merchant, grouping } => {
            commands::cmd_normalize(&merchant, grouping);
            Ok(())
        }
    }
}
