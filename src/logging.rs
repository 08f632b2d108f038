//! Tracing setup.
//!
//! Human-facing diagnostics go to stderr so stdout stays clean for command
//! output. The same events are appended to a daily log file under `logs/`.

use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Paths;
use crate::error::{DevsyncError, Result};

/// Log files are named `devsync.<date>.log`.
const FILE_PREFIX: &str = "devsync";
const FILE_SUFFIX: &str = "log";

/// Non-blocking writer for the daily log file in `dir`.
///
/// Buffered lines are flushed when the returned guard is dropped.
///
/// # Errors
///
/// Returns a config error if the log file cannot be created.
pub fn file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(FILE_PREFIX)
        .filename_suffix(FILE_SUFFIX)
        .build(dir)
        .map_err(|e| {
            DevsyncError::Config(format!("cannot open log file in {}: {e}", dir.display()))
        })?;

    Ok(tracing_appender::non_blocking(appender))
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `default_level`. Keep the guard alive until exit.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a
/// subscriber is already installed.
pub fn init(paths: &Paths, default_level: &str) -> Result<WorkerGuard> {
    paths.ensure_dirs()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let (file, guard) = file_writer(&paths.logs)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file))
        .try_init()
        .map_err(|e| DevsyncError::Config(format!("cannot install logger: {e}")))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_logs(dir: &Path) -> String {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect()
    }

    #[test]
    fn test_file_writer_appends_events() {
        let temp_dir = TempDir::new().unwrap();
        let (writer, guard) = file_writer(temp_dir.path()).unwrap();

        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(writer));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("loaded 3 sync tasks");
        });
        drop(guard);

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("devsync.") && names[0].ends_with(".log"));
        assert!(read_logs(temp_dir.path()).contains("loaded 3 sync tasks"));
    }

    #[test]
    fn test_file_writer_in_unusable_dir() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("logs");
        std::fs::write(&blocker, "not a directory").unwrap();

        assert!(matches!(file_writer(&blocker), Err(DevsyncError::Config(_))));
    }
}
