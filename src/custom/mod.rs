//! Custom per-page actions
//!
//! A custom action sees every fetch outcome and can collect its own data,
//! which is carried across checkpoints and written out when the crawl ends.
//! Actions are picked by name from the built-ins listed in
//! [`BUILTIN_ACTIONS`].

mod blank;
mod images;

pub use blank::BlankAction;
pub use images::{ImageExtractor, ImageRow};

use crate::config::Config;
use crate::crawler::{FetchError, PageResponse};
use crate::state::Counter;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Names accepted by `custom.custom-file`
pub const BUILTIN_ACTIONS: &[&str] = &["extract-images", "blank"];

/// Returns true if `name` is a built-in custom action
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_ACTIONS.contains(&name)
}

/// Creates a built-in custom action by name
pub fn from_name(name: &str) -> Option<Arc<dyn CustomAction>> {
    match name {
        "extract-images" => Some(Arc::new(ImageExtractor::new())),
        "blank" => Some(Arc::new(BlankAction)),
        _ => None,
    }
}

/// Creates the custom action selected by the configuration, if enabled
pub fn from_config(config: &Config) -> Option<Arc<dyn CustomAction>> {
    if !config.custom.use_custom {
        return None;
    }
    config.custom.custom_file.as_deref().and_then(from_name)
}

/// Hook into each crawled page and the end of the crawl
///
/// Implementations keep their data behind interior mutability; the
/// scheduler calls `action` from concurrent page pipelines.
#[async_trait]
pub trait CustomAction: Send + Sync {
    /// Called once per crawled page with the fetch outcome
    async fn action(
        &self,
        outcome: Result<&PageResponse, &FetchError>,
        page_url: &str,
        counter: Counter,
        config: &Config,
    ) -> anyhow::Result<()>;

    /// Writes the collected data once the crawl has finished
    async fn out(
        &self,
        config: &Config,
        start_timestamp: &str,
        output_path: &Path,
    ) -> anyhow::Result<()>;

    /// Collected data, stored in checkpoints as `customData`
    async fn data(&self) -> Vec<Value>;

    /// Replaces the collected data with data read from a checkpoint
    async fn restore_data(&self, data: Vec<Value>);
}
