//! JSON file checkpoint backend
//!
//! Checkpoints live in `{save_directory}/{id}/{id}_{start_timestamp}.json`.
//! Each save writes a temporary sibling file and renames it into place, so a
//! crash mid-write never leaves a truncated checkpoint behind.

use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Checkpoint store writing one JSON file per run
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
    id: String,
}

impl FileCheckpointStore {
    /// Creates a store for crawl `id` under `save_directory`
    ///
    /// Nothing is touched on disk until the first save.
    pub fn new(save_directory: impl AsRef<Path>, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            dir: save_directory.as_ref().join(&id),
            id,
        }
    }

    /// Directory holding this crawl's checkpoints
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the checkpoint for a given run
    pub fn path_for(&self, start_timestamp: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", self.id, start_timestamp))
    }

    fn is_checkpoint_name(&self, name: &str) -> bool {
        name.starts_with(&format!("{}_", self.id)) && name.ends_with(".json")
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, start_timestamp: &str, snapshot: &Value) -> StorageResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(start_timestamp);
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_vec(snapshot)?;
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &path)?;

        tracing::debug!("Checkpoint written to {}", path.display());
        Ok(path)
    }

    fn load_latest(&self) -> StorageResult<Option<(PathBuf, Value)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut latest: Option<String> = None;
        for entry in entries {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if self.is_checkpoint_name(&name) && latest.as_ref().map_or(true, |l| name > *l) {
                latest = Some(name);
            }
        }

        let Some(name) = latest else {
            return Ok(None);
        };

        let path = self.dir.join(name);
        let content = fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&content).map_err(|e| StorageError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(Some((path, value)))
    }
}
