//! Path resolution for devsync configuration and data files.
//!
//! All devsync data is stored in `~/.devsync/` unless `DEVSYNC_HOME` is set:
//! - `config.yaml` - Main configuration file
//! - `devsync.db` - SQLite sync queue
//! - `queue.json` - JSON sync queue (when the json backend is selected)
//! - `logs/` - Log output

use std::path::PathBuf;

use crate::error::{DevsyncError, Result};

/// Environment variable overriding the data root.
pub const HOME_ENV: &str = "DEVSYNC_HOME";

/// Paths to devsync configuration and data.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.devsync/`
    pub root: PathBuf,
    /// Config file: `~/.devsync/config.yaml`
    pub config_file: PathBuf,
    /// SQLite queue: `~/.devsync/devsync.db`
    pub database: PathBuf,
    /// JSON queue: `~/.devsync/queue.json`
    pub queue_file: PathBuf,
    /// Log directory: `~/.devsync/logs/`
    pub logs: PathBuf,
}

impl Paths {
    /// Resolve paths from `DEVSYNC_HOME`, falling back to `$HOME/.devsync`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither variable is set.
    pub fn new() -> Result<Self> {
        if let Ok(root) = std::env::var(HOME_ENV) {
            if !root.is_empty() {
                return Ok(Self::with_root(PathBuf::from(root)));
            }
        }

        let home = std::env::var("HOME").map_err(|_| {
            DevsyncError::Config("Could not determine home directory".to_string())
        })?;

        Ok(Self::with_root(PathBuf::from(home).join(".devsync")))
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("devsync.db"),
            queue_file: root.join("queue.json"),
            logs: root.join("logs"),
            root,
        }
    }

    /// Ensure all directories exist, creating them if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.root, &self.logs] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    DevsyncError::Config(format!("Failed to create directory {}: {e}", dir.display()))
                })?;
            }
        }

        Ok(())
    }
}
