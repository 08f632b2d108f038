//! Observability surface for UI layers.
//!
//! Log lines are broadcast to any number of subscribers as they happen and
//! mirrored into `tracing`. The status read model is a plain value the UI
//! can render however it likes.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::device::ConnectionState;

/// Lines buffered per subscriber before the slowest one starts lagging.
const DEFAULT_CAPACITY: usize = 256;

/// What a log line is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Link came up or went down.
    Connection,
    /// A sync pass began.
    PassStarted,
    /// A sync pass ended.
    PassFinished,
    /// Outcome of one task.
    Task,
    /// Queue bookkeeping (placeholders, pruning, persistence).
    Queue,
    /// Scheduler lifecycle.
    Scheduler,
}

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Normal progress.
    Info,
    /// Something degraded but recovered.
    Warn,
    /// Something failed.
    Error,
}

/// One human-readable log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    /// When it happened, local time.
    pub timestamp: DateTime<Local>,
    /// Severity.
    pub level: Level,
    /// Category.
    pub kind: EventKind,
    /// Message text.
    pub message: String,
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Broadcast channel of log lines.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LogLine>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Create a bus buffering `capacity` lines per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every line emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LogLine> {
        self.tx.subscribe()
    }

    /// Emit an informational line.
    pub fn info(&self, kind: EventKind, message: impl Into<String>) {
        self.emit(Level::Info, kind, message.into());
    }

    /// Emit a warning line.
    pub fn warn(&self, kind: EventKind, message: impl Into<String>) {
        self.emit(Level::Warn, kind, message.into());
    }

    /// Emit an error line.
    pub fn error(&self, kind: EventKind, message: impl Into<String>) {
        self.emit(Level::Error, kind, message.into());
    }

    fn emit(&self, level: Level, kind: EventKind, message: String) {
        match level {
            Level::Info => info!(?kind, "{message}"),
            Level::Warn => warn!(?kind, "{message}"),
            Level::Error => error!(?kind, "{message}"),
        }

        // No subscribers is fine.
        let _ = self.tx.send(LogLine {
            timestamp: Local::now(),
            level,
            kind,
            message,
        });
    }
}

/// Read model for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    /// "Connected" or "Disconnected".
    pub device_status: String,
    /// When the current connection began.
    pub connected_since: Option<DateTime<Utc>>,
    /// Formatted connection duration, `-` when disconnected.
    pub connection_duration: String,
    /// Tasks still waiting for a pass.
    pub pending_count: usize,
}

impl StatusView {
    /// Build the view for a link state at `now`.
    #[must_use]
    pub fn new(state: ConnectionState, pending_count: usize, now: DateTime<Utc>) -> Self {
        let connection_duration = state
            .since()
            .map_or_else(|| "-".to_string(), |since| format_duration(now - since));

        Self {
            device_status: state.to_string(),
            connected_since: state.since(),
            connection_duration,
            pending_count,
        }
    }
}

/// Format a duration as `1d 2h 3m 4s`. Negative durations count as zero.
#[must_use]
pub fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    format!("{days}d {hours}h {minutes}m {seconds}s")
}
