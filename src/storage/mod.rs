//! Storage layer for devsync.
//!
//! Durable homes for the sync task list:
//! - `SQLite` (default), with schema migrations
//! - a single JSON document
//! - an in-memory store for embedding and tests

mod json_file;
mod migrations;
mod sqlite;
mod store;

use crate::config::{Paths, StorageBackend};
use crate::error::DevsyncError;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteQueueStore;
pub use store::{MemoryStore, QueueStore};

/// Open the configured store under the data root.
///
/// # Errors
///
/// Returns an error if the `SQLite` database cannot be opened.
pub fn open_store(
    paths: &Paths,
    backend: StorageBackend,
) -> Result<Box<dyn QueueStore>, DevsyncError> {
    Ok(match backend {
        StorageBackend::Sqlite => Box::new(SqliteQueueStore::open(&paths.database)?),
        StorageBackend::Json => Box::new(JsonFileStore::new(paths.queue_file.clone())),
    })
}
