//! Sync executor for delivering queued tasks.
//!
//! Attempts tasks one at a time through the device link and records each
//! outcome in the queue. Failures never stop the remaining tasks.

use serde::Serialize;
use uuid::Uuid;

use super::queue::{MarkOutcome, SyncTaskQueue};
use super::task::{Outcome, SyncTask, TaskStatus};
use crate::device::DeviceLink;
use crate::events::{EventBus, EventKind};

/// Result of attempting a single task.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Task ID
    pub id: Uuid,
    /// Whether the device acknowledged it
    pub success: bool,
    /// Delivery error, if it failed
    pub error: Option<String>,
    /// Whether the outcome reached the store. When false the task is
    /// still `Pending` and the next pass attempts it again.
    pub recorded: bool,
}

/// Result of draining a snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    /// Number of delivered tasks
    pub succeeded: usize,
    /// Number of failed tasks
    pub failed: usize,
    /// Individual results, in attempt order
    pub results: Vec<ExecutionResult>,
}

impl SyncResult {
    /// Add a result.
    pub fn add(&mut self, result: ExecutionResult) {
        if result.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    /// Check if every attempt succeeded.
    #[must_use]
    pub const fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Get total tasks attempted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Attempts whose outcome could not be saved.
    #[must_use]
    pub fn unrecorded(&self) -> usize {
        self.results.iter().filter(|r| !r.recorded).count()
    }
}

/// Executor delivering tasks through a [`DeviceLink`].
pub struct SyncExecutor<'a> {
    queue: &'a SyncTaskQueue,
    link: &'a dyn DeviceLink,
    events: &'a EventBus,
}

impl<'a> SyncExecutor<'a> {
    /// Create a new executor.
    #[must_use]
    pub const fn new(queue: &'a SyncTaskQueue, link: &'a dyn DeviceLink, events: &'a EventBus) -> Self {
        Self {
            queue,
            link,
            events,
        }
    }

    /// Attempt every `Pending` task in `snapshot`, in order.
    ///
    /// Tasks enqueued after the snapshot was taken are left for the next pass.
    pub async fn execute_all(&self, snapshot: &[SyncTask]) -> SyncResult {
        let mut result = SyncResult::default();

        for task in snapshot.iter().filter(|t| t.status() == TaskStatus::Pending) {
            result.add(self.execute_one(task).await);
        }

        result
    }

    /// Attempt a single task and record the outcome.
    pub async fn execute_one(&self, task: &SyncTask) -> ExecutionResult {
        let id = task.id();

        let (outcome, error) = match self.link.attempt_sync(task.payload()).await {
            Ok(ack) => {
                self.events
                    .info(EventKind::Task, format!("Task {id} synced: {}", ack.message));
                (Outcome::Completed, None)
            }
            Err(e) => {
                self.events
                    .warn(EventKind::Task, format!("Task {id} failed: {e}"));
                (Outcome::Failed, Some(e.to_string()))
            }
        };

        let recorded = match self.queue.mark_result(id, outcome) {
            Ok(MarkOutcome::Applied) => true,
            Ok(other) => {
                tracing::debug!("task {id} outcome not applied: {other:?}");
                true
            }
            Err(e) => {
                self.events.error(
                    EventKind::Queue,
                    format!("Outcome for task {id} not saved, it stays pending: {e}"),
                );
                false
            }
        };

        ExecutionResult {
            id,
            success: outcome == Outcome::Completed,
            error,
            recorded,
        }
    }
}
