use crate::config::Config;
use crate::crawler::{extract_image_sources, FetchError, PageResponse};
use crate::custom::CustomAction;
use crate::state::Counter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tokio::sync::Mutex;

/// Images found on one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRow {
    pub page: String,
    /// Comma-separated `src` values in document order
    pub src: String,
}

/// Collects the image sources of every page that returned HTTP 200
///
/// Rows are written to `{id}_custom.csv` when the crawl finishes.
#[derive(Debug, Default)]
pub struct ImageExtractor {
    rows: Mutex<Vec<ImageRow>>,
}

impl ImageExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rows(&self) -> Vec<ImageRow> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl CustomAction for ImageExtractor {
    async fn action(
        &self,
        outcome: Result<&PageResponse, &FetchError>,
        page_url: &str,
        _counter: Counter,
        _config: &Config,
    ) -> anyhow::Result<()> {
        let Ok(response) = outcome else {
            return Ok(());
        };
        if response.status_code != 200 {
            return Ok(());
        }
        let Some(body) = response.body.as_deref() else {
            return Ok(());
        };

        let sources = extract_image_sources(body);
        if sources.is_empty() {
            return Ok(());
        }

        self.rows.lock().await.push(ImageRow {
            page: page_url.to_string(),
            src: sources.join(","),
        });
        Ok(())
    }

    async fn out(
        &self,
        config: &Config,
        _start_timestamp: &str,
        output_path: &Path,
    ) -> anyhow::Result<()> {
        let rows = self.rows.lock().await;
        let path = output_path.join(format!("{}_custom.csv", config.id));

        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows.iter() {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::info!("Wrote {} image row(s) to {}", rows.len(), path.display());
        Ok(())
    }

    async fn data(&self) -> Vec<Value> {
        self.rows
            .lock()
            .await
            .iter()
            .filter_map(|row| serde_json::to_value(row).ok())
            .collect()
    }

    async fn restore_data(&self, data: Vec<Value>) {
        let mut rows = self.rows.lock().await;
        rows.clear();
        for value in data {
            match serde_json::from_value::<ImageRow>(value) {
                Ok(row) => rows.push(row),
                Err(e) => tracing::warn!("Ignoring malformed custom data entry: {}", e),
            }
        }
    }
}
