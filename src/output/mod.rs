//! Output module for writing crawl results
//!
//! This module handles:
//! - Writing the default page data through an [`OutputWriter`]
//! - Dumping URLs discarded by the crawl-links policy
//! - Generating the crawl report
//!
//! Every file of a run lands in `{output-directory}/{id}/{startTimestamp}/`.

pub mod stats;
mod traits;
mod writers;

pub use stats::{print_report, write_report, CrawlReport};
pub use traits::{OutputError, OutputResult, OutputWriter};
pub use writers::{writer_for, BlankWriter, ConsoleWriter, CsvWriter, JsonWriter};

use crate::config::Config;
use crate::state::Frontier;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory holding the outputs of one run
pub fn output_directory(config: &Config, start_timestamp: &str) -> PathBuf {
    Path::new(&config.output.output_directory)
        .join(&config.id)
        .join(start_timestamp)
}

/// Creates the run's output directory and returns it
pub fn prepare_output_directory(config: &Config, start_timestamp: &str) -> OutputResult<PathBuf> {
    let dir = output_directory(config, start_timestamp);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Writes `{id}_discardedURLs.json` if any URL was discarded
///
/// # Returns
///
/// * `Ok(Some(PathBuf))` - Path of the written dump
/// * `Ok(None)` - Nothing was discarded
/// * `Err(OutputError)` - Failed to write the dump
pub fn write_discarded(
    config: &Config,
    frontier: &Frontier,
    output_path: &Path,
) -> OutputResult<Option<PathBuf>> {
    if frontier.discarded_pages.is_empty() {
        return Ok(None);
    }

    let path = output_path.join(format!("{}_discardedURLs.json", config.id));
    let mut file = File::create(&path)?;
    file.write_all(serde_json::to_string_pretty(&frontier.discarded_pages)?.as_bytes())?;

    tracing::info!(
        "Wrote {} discarded URL(s) to {}",
        frontier.discarded_pages.len(),
        path.display()
    );
    Ok(Some(path))
}

/// Writes the default page data with the configured writer
pub fn write_default_output(
    config: &Config,
    frontier: &Frontier,
    output_path: &Path,
) -> OutputResult<()> {
    writer_for(config.output.format).write(
        config,
        &frontier.start_timestamp,
        &frontier.output_data,
        output_path,
    )
}
