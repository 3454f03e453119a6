//! Bulk path: scan an SMS export

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use paisa_core::{
    BulkScan, CandidateTransaction, Pipeline, RawSms, ScanOptions, ScanReport, ScanSummary,
};
use serde::Deserialize;
use tracing::warn;

use crate::cli::InputFormat;

/// One row of an SMS backup CSV export
#[derive(Debug, Deserialize)]
struct CsvRecord {
    address: String,
    body: String,
    /// Delivery time in millis
    date: i64,
}

pub async fn cmd_scan(
    pipeline: &Pipeline,
    file: &Path,
    format: InputFormat,
    since: Option<i64>,
    output: Option<&Path>,
    show_groups: bool,
) -> Result<()> {
    let format = resolve_format(file, format);
    let input =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let messages = read_messages(input, format)?;

    println!(
        "📥 Scanning {} messages from {}...",
        messages.len(),
        file.display()
    );

    let options = ScanOptions {
        since_millis: since,
        ..ScanOptions::from_config(pipeline.config())
    };
    let report = run_scan(pipeline, &messages, options).await;

    print_summary(&report.summary, report.records.len());

    if let Some(path) = output {
        write_jsonl(path, &report.records)?;
        println!(
            "💾 Wrote {} transactions to {}",
            report.records.len(),
            path.display()
        );
    }

    if show_groups {
        if report.groups.is_empty() {
            println!("\nNo merchant grouping suggestions.");
        } else {
            println!("\n🔗 Merchant grouping suggestions:");
            for group in &report.groups {
                println!("   {} ← {}", group.key, group.members.join(", "));
            }
        }
    }

    Ok(())
}

/// Drive the scan, yielding to the runtime every `yield_every` messages
pub async fn run_scan(pipeline: &Pipeline, messages: &[RawSms], options: ScanOptions) -> ScanReport {
    let yield_every = pipeline.config().yield_every;
    let mut scan = BulkScan::new(pipeline, options).with_progress(Box::new(|summary: &ScanSummary| {
        println!(
            "   ... {} processed ({} retained so far)",
            summary.processed,
            summary.successes() - summary.duplicates
        );
    }));

    for (i, sms) in messages.iter().enumerate() {
        scan.push(sms);
        if yield_every > 0 && (i as u64 + 1) % yield_every == 0 {
            tokio::task::yield_now().await;
        }
    }

    scan.finish()
}

pub fn resolve_format(file: &Path, format: InputFormat) -> InputFormat {
    match format {
        InputFormat::Auto => {
            let is_csv = file
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            if is_csv {
                InputFormat::Csv
            } else {
                InputFormat::Jsonl
            }
        }
        other => other,
    }
}

/// Read messages; malformed rows are logged and skipped
pub fn read_messages<R: Read>(reader: R, format: InputFormat) -> Result<Vec<RawSms>> {
    match format {
        InputFormat::Csv => read_csv(reader),
        InputFormat::Jsonl | InputFormat::Auto => read_jsonl(reader),
    }
}

fn read_csv<R: Read>(reader: R) -> Result<Vec<RawSms>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut messages = Vec::new();
    for (row, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        match result {
            Ok(record) => messages.push(RawSms::new(record.address, record.body, record.date)),
            Err(e) => warn!("Skipping CSV row {}: {}", row + 2, e),
        }
    }
    Ok(messages)
}

fn read_jsonl<R: Read>(reader: R) -> Result<Vec<RawSms>> {
    let mut messages = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawSms>(&line) {
            Ok(sms) => messages.push(sms),
            Err(e) => warn!("Skipping line {}: {}", idx + 1, e),
        }
    }
    Ok(messages)
}

pub fn write_jsonl(path: &Path, records: &[CandidateTransaction]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn print_summary(summary: &ScanSummary, retained: usize) {
    println!("\n📊 Scan summary");
    println!("   Processed:     {}", summary.processed);
    if summary.skipped > 0 {
        println!("   Skipped:       {} (before sync cursor)", summary.skipped);
    }
    println!("   ✅ Accepted:    {}", summary.accepted);
    println!("   👀 Monitored:   {}", summary.monitored);
    println!("   📝 Review:      {}", summary.needs_review);
    println!("   🔁 Duplicates:  {}", summary.duplicates);
    println!("   🚫 Rejected:    {}", summary.rejected_total());
    for (reason, count) in &summary.rejected {
        println!("      {:<22} {}", reason.as_str(), count);
    }
    println!("   Retained:      {}", retained);
    if let Some(cursor) = summary.last_timestamp {
        println!("   Sync cursor:   {} (pass --since {} next time)", cursor, cursor);
    }
}
