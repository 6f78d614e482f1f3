//! Crawl report generation
//!
//! The report summarizes a run's counters and is written next to the other
//! outputs as `{id}_report.json`.

use crate::output::traits::OutputResult;
use crate::state::Frontier;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Summary of one crawl run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub id: String,
    pub start_timestamp: String,
    pub pages_crawled: u64,
    pub pages_discarded: usize,
    pub pages_remaining: usize,
    /// Number of stored page records with an error
    pub pages_failed: usize,
    pub finished: bool,
}

impl CrawlReport {
    pub fn from_frontier(id: &str, frontier: &Frontier) -> Self {
        Self {
            id: id.to_string(),
            start_timestamp: frontier.start_timestamp.clone(),
            pages_crawled: frontier.counter.crawled,
            pages_discarded: frontier.discarded_pages.len(),
            pages_remaining: frontier.pages_to_visit.len(),
            pages_failed: frontier
                .output_data
                .values()
                .filter(|record| record.error.is_error())
                .count(),
            finished: frontier.finished,
        }
    }
}

/// Writes the report to `{output_path}/{id}_report.json`
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_report(report: &CrawlReport, output_path: &Path) -> OutputResult<PathBuf> {
    let path = output_path.join(format!("{}_report.json", report.id));
    let mut file = File::create(&path)?;
    file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;
    Ok(path)
}

/// Prints the report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report: {} ===\n", report.id);
    println!("  Started:   {}", report.start_timestamp);
    println!("  Crawled:   {}", report.pages_crawled);
    println!("  Failed:    {}", report.pages_failed);
    println!("  Discarded: {}", report.pages_discarded);
    println!("  Remaining: {}", report.pages_remaining);
    println!("  Finished:  {}", report.finished);
}
