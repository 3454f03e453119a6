//! Live path: parse one SMS under a deadline

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use paisa_core::{ParseResult, Pipeline, RawSms};
use tracing::debug;

use super::print_result;

pub async fn cmd_parse(
    pipeline: Pipeline,
    from: &str,
    body: &str,
    timestamp: Option<i64>,
    json: bool,
) -> Result<()> {
    let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp_millis());
    let sms = RawSms::new(from, body, timestamp);

    let result = parse_live(pipeline, sms).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

/// Run the pipeline off the async runtime, bounded by `live_timeout_ms`
pub async fn parse_live(pipeline: Pipeline, sms: RawSms) -> Result<ParseResult> {
    let timeout_ms = pipeline.config().live_timeout_ms;
    let started = std::time::Instant::now();

    let handle = tokio::task::spawn_blocking(move || pipeline.parse(&sms));
    let result = tokio::time::timeout(Duration::from_millis(timeout_ms), handle)
        .await
        .map_err(|_| anyhow!("Parse exceeded the {} ms live deadline", timeout_ms))?
        .context("Parse task failed")?;

    debug!("Live parse took {:?}", started.elapsed());
    Ok(result)
}
