//! Checkpoint save and restore
//!
//! Wraps a [`CheckpointStore`] with the `beforeSaveStatus` and
//! `afterSaveFileRead` hooks and the rules for deciding whether a stored
//! snapshot resumes the crawl.

use crate::config::Config;
use crate::hooks::{HookEvent, HookRegistry};
use crate::state::Frontier;
use crate::storage::file_store::FileCheckpointStore;
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of looking for a resumable checkpoint
#[derive(Debug)]
pub enum Restore {
    /// An unfinished checkpoint was found and loaded
    Resumed { path: PathBuf, frontier: Frontier },
    /// No checkpoint, or the latest one belongs to a finished crawl
    StartFresh,
}

/// Saves and restores frontier snapshots
///
/// Store I/O runs on the blocking thread pool.
#[derive(Clone)]
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    hooks: Arc<HookRegistry>,
}

impl std::fmt::Debug for CheckpointManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointManager").finish_non_exhaustive()
    }
}

impl CheckpointManager {
    pub fn new(store: Arc<dyn CheckpointStore>, hooks: Arc<HookRegistry>) -> Self {
        Self { store, hooks }
    }

    /// Creates a manager backed by JSON files under `output.save-directory`
    pub fn for_config(config: &Config, hooks: Arc<HookRegistry>) -> Self {
        let store = FileCheckpointStore::new(&config.output.save_directory, &config.id);
        Self::new(Arc::new(store), hooks)
    }

    /// Serializes and saves a frontier
    pub async fn save(&self, frontier: &Frontier) -> StorageResult<PathBuf> {
        let snapshot = frontier.to_snapshot()?;
        self.save_snapshot(&frontier.start_timestamp, snapshot).await
    }

    /// Saves an already serialized frontier
    ///
    /// `beforeSaveStatus` handlers may replace `savedData` before it is
    /// written.
    pub async fn save_snapshot(
        &self,
        start_timestamp: &str,
        snapshot: Value,
    ) -> StorageResult<PathBuf> {
        let data = if self.hooks.handler_count(HookEvent::BeforeSaveStatus) == 0 {
            snapshot
        } else {
            let mut merged = self
                .hooks
                .emit(HookEvent::BeforeSaveStatus, json!({ "savedData": snapshot }))
                .await;
            merged
                .get_mut("savedData")
                .map(Value::take)
                .unwrap_or(Value::Null)
        };

        if !data.is_object() {
            return Err(StorageError::Corrupt {
                path: start_timestamp.to_string(),
                message: "beforeSaveStatus produced a non-object savedData".to_string(),
            });
        }

        let store = Arc::clone(&self.store);
        let start_timestamp = start_timestamp.to_string();
        let path =
            tokio::task::spawn_blocking(move || store.save(&start_timestamp, &data)).await??;
        tracing::info!("Saved crawl status to {}", path.display());
        Ok(path)
    }

    /// Looks for a checkpoint to resume from
    ///
    /// Returns [`Restore::StartFresh`] when there is no checkpoint or the
    /// latest one is finished. An unreadable latest checkpoint is an error.
    pub async fn restore(&self) -> StorageResult<Restore> {
        let store = Arc::clone(&self.store);
        let latest = tokio::task::spawn_blocking(move || store.load_latest()).await??;
        let Some((path, saved)) = latest else {
            tracing::info!("No save file found. Starting fresh ...");
            return Ok(Restore::StartFresh);
        };

        if saved.get("finished").and_then(Value::as_bool).unwrap_or(false) {
            tracing::info!(
                "Found save file {} but this crawl is finished. Starting fresh ...",
                path.display()
            );
            return Ok(Restore::StartFresh);
        }

        tracing::info!("Reading save file: {}", path.display());

        let mut merged = self
            .hooks
            .emit(HookEvent::AfterSaveFileRead, json!({ "savedData": saved }))
            .await;
        let data = merged
            .get_mut("savedData")
            .map(Value::take)
            .unwrap_or(Value::Null);

        let frontier = Frontier::from_snapshot(data).map_err(|e| StorageError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(Restore::Resumed { path, frontier })
    }
}
