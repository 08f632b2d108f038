//! Persistent queue store abstraction.
//!
//! A store holds the whole ordered task list. `save` replaces the list
//! atomically: after a failed save the previously saved list is still
//! what `load` returns.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::DevsyncError;
use crate::sync::SyncTask;

/// Durable storage for the ordered task list.
pub trait QueueStore: Send {
    /// Read the persisted list.
    ///
    /// An absent store yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`DevsyncError::Persistence`] if the store is unreadable or corrupt.
    fn load(&self) -> Result<Vec<SyncTask>, DevsyncError>;

    /// Replace the persisted list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list could not be written.
    fn save(&mut self, tasks: &[SyncTask]) -> Result<(), DevsyncError>;

    /// Short human-readable location for log lines.
    fn describe(&self) -> String;
}

/// Volatile store backed by a shared vector.
///
/// Clones share the same list, so a clone kept aside sees what the
/// queue wrote. Handy for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tasks: Arc<Mutex<Vec<SyncTask>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with tasks.
    #[must_use]
    pub fn with_tasks(tasks: Vec<SyncTask>) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(tasks)),
        }
    }

    /// Copy of the currently saved list.
    #[must_use]
    pub fn saved(&self) -> Vec<SyncTask> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QueueStore for MemoryStore {
    fn load(&self) -> Result<Vec<SyncTask>, DevsyncError> {
        Ok(self.saved())
    }

    fn save(&mut self, tasks: &[SyncTask]) -> Result<(), DevsyncError> {
        let mut saved = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        *saved = tasks.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
