use crate::config::Config;
use crate::crawler::{FetchError, PageResponse};
use crate::custom::CustomAction;
use crate::state::Counter;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// Custom action that only logs what it is called with
#[derive(Debug, Default, Clone, Copy)]
pub struct BlankAction;

#[async_trait]
impl CustomAction for BlankAction {
    async fn action(
        &self,
        outcome: Result<&PageResponse, &FetchError>,
        page_url: &str,
        counter: Counter,
        _config: &Config,
    ) -> anyhow::Result<()> {
        let status = match outcome {
            Ok(response) => response.status_code.to_string(),
            Err(e) => e.to_string(),
        };
        tracing::debug!(
            "custom action called for {} ({}), crawled {}",
            page_url,
            status,
            counter.crawled
        );
        Ok(())
    }

    async fn out(
        &self,
        config: &Config,
        start_timestamp: &str,
        output_path: &Path,
    ) -> anyhow::Result<()> {
        tracing::debug!(
            "custom output called for {} ({}) in {}",
            config.id,
            start_timestamp,
            output_path.display()
        );
        Ok(())
    }

    async fn data(&self) -> Vec<Value> {
        Vec::new()
    }

    async fn restore_data(&self, _data: Vec<Value>) {}
}
