//! Configuration settings for devsync.
//!
//! Settings are loaded from `~/.devsync/config.yaml`. Every field has a
//! default, so partial files are fine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Paths;
use crate::error::{DevsyncError, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Device connection settings.
    pub device: DeviceConfig,
    /// Scheduler and retention settings.
    pub sync: SyncConfig,
    /// Queue storage settings.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Device connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device network address. Empty means "use the local IP".
    pub address: String,
    /// Login name.
    pub username: Option<String>,
    /// Login secret.
    pub password: Option<String>,
}

/// Scheduler and retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Fixed-interval trigger period.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// Whether the local-midnight trigger is armed.
    #[serde(default = "default_true")]
    pub daily_boundary: bool,
    /// Terminal tasks older than this are pruned.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// Queue store backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite database.
    #[default]
    Sqlite,
    /// Single JSON document.
    Json,
}

/// Queue storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Which store adapter backs the queue.
    pub backend: StorageBackend,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

const fn default_interval_minutes() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}

const fn default_retention_days() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            daily_boundary: default_true(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Longest accepted sync interval: one week.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Longest accepted retention window: about a century.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Retention window for `days`, capped at [`MAX_RETENTION_DAYS`].
#[must_use]
pub fn retention_window(days: u32) -> chrono::Duration {
    chrono::Duration::days(i64::from(days.min(MAX_RETENTION_DAYS)))
}

impl SyncConfig {
    /// Fixed-interval trigger period as a [`Duration`], between one minute
    /// and [`MAX_INTERVAL_MINUTES`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.clamp(1, MAX_INTERVAL_MINUTES) * 60)
    }

    /// Retention window as a chrono duration.
    #[must_use]
    pub fn retention(&self) -> chrono::Duration {
        retention_window(self.retention_days)
    }

    /// Reject values outside the supported ranges.
    ///
    /// # Errors
    ///
    /// Returns a config error naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(DevsyncError::Config(format!(
                "sync.interval_minutes must be at most {MAX_INTERVAL_MINUTES}, got {}",
                self.interval_minutes
            )));
        }
        if self.retention_days > MAX_RETENTION_DAYS {
            return Err(DevsyncError::Config(format!(
                "sync.retention_days must be at most {MAX_RETENTION_DAYS}, got {}",
                self.retention_days
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let paths = Paths::new()?;
        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            DevsyncError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            DevsyncError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })?;
        config.sync.validate()?;

        Ok(config)
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<()> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| DevsyncError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents).map_err(|e| {
            DevsyncError::Config(format!(
                "Failed to write config file {}: {e}",
                path.display()
            ))
        })
    }
}
