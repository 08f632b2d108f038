//! Sync task model.
//!
//! A task is one unit of work that must eventually reach the device. Only
//! its status changes after creation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for a sync pass
    Pending,
    /// Delivered to the device
    Completed,
    /// Delivery failed; never retried automatically
    Failed,
}

impl TaskStatus {
    /// Check if this status is terminal (no more action needed).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Stable lowercase name used by stores.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

/// Result reported for a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The device acknowledged the task.
    Completed,
    /// The attempt failed.
    Failed,
}

impl From<Outcome> for TaskStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => Self::Completed,
            Outcome::Failed => Self::Failed,
        }
    }
}

/// A queued sync task.
///
/// An absent payload is a heartbeat sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTask {
    id: Uuid,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<serde_json::Value>,
    status: TaskStatus,
}

impl SyncTask {
    /// Create a new pending task. A JSON `null` payload is a heartbeat.
    pub(crate) fn new(payload: Option<serde_json::Value>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            payload: without_null(payload),
            status: TaskStatus::Pending,
        }
    }

    /// Rebuild a task read back from a store.
    pub(crate) fn restore(
        id: Uuid,
        created_at: DateTime<Utc>,
        payload: Option<serde_json::Value>,
        status: TaskStatus,
    ) -> Self {
        Self {
            id,
            created_at,
            payload: without_null(payload),
            status,
        }
    }

    /// Unique identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// When the task was enqueued.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Payload to deliver, if any.
    #[must_use]
    pub const fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Whether this task is a heartbeat (no payload).
    #[must_use]
    pub const fn is_heartbeat(&self) -> bool {
        self.payload.is_none()
    }

    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }
}

// Serde reads a `null` payload field as `None`; every other path must agree.
fn without_null(payload: Option<serde_json::Value>) -> Option<serde_json::Value> {
    payload.filter(|p| !p.is_null())
}
