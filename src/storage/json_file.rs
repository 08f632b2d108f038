//! JSON file queue store.
//!
//! The whole list is one document. Writes go to a sibling temp file that
//! is renamed over the original, so a torn write never replaces a good list.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::store::QueueStore;
use crate::error::DevsyncError;
use crate::sync::SyncTask;

const STATE_VERSION: u8 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueDocument {
    #[serde(default = "default_version")]
    version: u8,
    #[serde(default)]
    tasks: Vec<SyncTask>,
}

const fn default_version() -> u8 {
    STATE_VERSION
}

/// Queue store persisted as a JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store at a path. Nothing is touched until the first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Write `bytes` and flush them to disk before returning.
fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl QueueStore for JsonFileStore {
    fn load(&self) -> Result<Vec<SyncTask>, DevsyncError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DevsyncError::Persistence(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let document: QueueDocument = serde_json::from_slice(&bytes).map_err(|e| {
            DevsyncError::Persistence(format!("cannot parse {}: {e}", self.path.display()))
        })?;

        Ok(document.tasks)
    }

    fn save(&mut self, tasks: &[SyncTask]) -> Result<(), DevsyncError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DevsyncError::Persistence(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let document = QueueDocument {
            version: STATE_VERSION,
            tasks: tasks.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&document).map_err(|e| {
            DevsyncError::Persistence(format!("cannot encode queue document: {e}"))
        })?;

        let temp = self.temp_path();
        write_synced(&temp, &json).map_err(|e| {
            DevsyncError::Persistence(format!("cannot write {}: {e}", temp.display()))
        })?;
        std::fs::rename(&temp, &self.path).map_err(|e| {
            DevsyncError::Persistence(format!("cannot replace {}: {e}", self.path.display()))
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
