//! Configuration management for devsync.
//!
//! This module handles loading configuration from `~/.devsync/`.

mod paths;
mod settings;

pub use paths::{Paths, HOME_ENV};
pub use settings::{
    retention_window, Config, DeviceConfig, LoggingConfig, StorageBackend, StorageConfig,
    SyncConfig, MAX_INTERVAL_MINUTES, MAX_RETENTION_DAYS,
};
