//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt checkpoint {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("Checkpoint task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for checkpoint backend implementations
///
/// Implementations may block; [`CheckpointManager`](crate::storage::CheckpointManager)
/// calls them on the blocking thread pool.
///
/// Backends store opaque JSON snapshots keyed by the run's start timestamp.
/// Ordering of snapshots is by name, so the timestamp format must sort
/// chronologically.
pub trait CheckpointStore: Send + Sync {
    /// Persists a snapshot, replacing any earlier snapshot of the same run
    ///
    /// # Arguments
    ///
    /// * `start_timestamp` - Identity of the run the snapshot belongs to
    /// * `snapshot` - The serialized frontier
    ///
    /// # Returns
    ///
    /// Location the snapshot was written to
    fn save(&self, start_timestamp: &str, snapshot: &Value) -> StorageResult<PathBuf>;

    /// Loads the most recent snapshot, if any exists
    fn load_latest(&self) -> StorageResult<Option<(PathBuf, Value)>>;
}
