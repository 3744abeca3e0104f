//! JSON output for a finished crawl.
//!
//! One document per run, holding the whole [`CrawlReport`]: extracted items in
//! feed order plus any per-item failures. Files are grouped by UTC date and
//! named after the feed and the time of the run.

use crate::models::CrawlReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Serialize)]
struct Document<'a> {
    feed: &'a str,
    captured_at: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a CrawlReport,
}

/// Write `report` under `output_dir` and return the file's path.
///
/// The file is written to: `{output_dir}/{YYYY-MM-DD}/{label}_{HHMMSS}.json`
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, %label))]
pub async fn write_report(
    report: &CrawlReport,
    output_dir: &str,
    label: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    write_report_at(report, output_dir, label, Utc::now()).await
}

async fn write_report_at(
    report: &CrawlReport,
    output_dir: &str,
    label: &str,
    now: DateTime<Utc>,
) -> Result<PathBuf, Box<dyn Error>> {
    let doc = Document {
        feed: label,
        captured_at: now,
        report,
    };
    let json = serde_json::to_string_pretty(&doc)?;

    let dir = PathBuf::from(output_dir).join(now.format("%Y-%m-%d").to_string());
    info!(dir = %dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&dir).await {
        error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = dir.join(format!("{}_{}.json", label, now.format("%H%M%S")));
    fs::write(&path, json).await?;
    info!(
        path = %path.display(),
        items = report.items.len(),
        failures = report.failures.len(),
        "Wrote crawl report"
    );

    Ok(path)
}
