//! Storage module for persisting crawl progress
//!
//! This module handles checkpointing the frontier so an interrupted crawl
//! can pick up where it stopped:
//! - The `CheckpointStore` trait and its JSON file backend
//! - `CheckpointManager`, which applies save/restore hooks and resume rules

mod checkpoint;
mod file_store;
mod traits;

pub use checkpoint::{CheckpointManager, Restore};
pub use file_store::FileCheckpointStore;
pub use traits::{CheckpointStore, StorageError, StorageResult};
