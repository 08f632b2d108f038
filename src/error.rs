//! Error types for devsync.
//!
//! Per-task and per-pass failures are absorbed by the scheduler and turned
//! into task status updates or log lines. Only connect/config errors and
//! storage errors reach callers directly.

use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum DevsyncError {
    /// Queue store read or write failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Device rejected the supplied credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Device could not be reached or the link is not usable.
    #[error("connection error: {0}")]
    Connection(String),

    /// Configuration could not be read, parsed or written.
    #[error("config error: {0}")]
    Config(String),

    /// The scheduler was stopped before the request could be served.
    #[error("scheduler stopped")]
    SchedulerStopped,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single `attempt_sync` call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The link dropped before the attempt.
    #[error("device not connected")]
    NotConnected,

    /// The device answered but refused the payload.
    #[error("rejected by device: {0}")]
    Rejected(String),

    /// Transport-level failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, DevsyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_display() {
        let err = DeliveryError::Rejected("busy".to_string());
        assert_eq!(err.to_string(), "rejected by device: busy");
        assert_eq!(DeliveryError::NotConnected.to_string(), "device not connected");
    }

    #[test]
    fn test_persistence_display() {
        let err = DevsyncError::Persistence("disk full".to_string());
        assert_eq!(err.to_string(), "persistence error: disk full");
    }
}
