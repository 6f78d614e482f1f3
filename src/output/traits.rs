//! Output writer trait and errors

use crate::config::Config;
use crate::state::PageRecord;
use indexmap::IndexMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes the collected page records once a crawl has finished
pub trait OutputWriter: Send + Sync {
    /// Writes `output_data`
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `start_timestamp` - Identity of the run being written
    /// * `output_data` - Page records keyed by URL, in crawl order
    /// * `output_path` - Existing directory for this run's files
    fn write(
        &self,
        config: &Config,
        start_timestamp: &str,
        output_data: &IndexMap<String, PageRecord>,
        output_path: &Path,
    ) -> OutputResult<()>;
}
