//! Sync task queue.
//!
//! The queue owns the ordered task list and its store. Mutations go
//! through a single writer lock and are saved before they become visible;
//! readers get a consistent copy of the last committed list.
//!
//! Retention: `Pending` tasks are kept forever. Terminal tasks are kept for
//! audit until [`SyncTaskQueue::prune`] removes those created before the
//! retention cutoff.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::task::{Outcome, SyncTask, TaskStatus};
use crate::error::DevsyncError;
use crate::storage::QueueStore;

/// The task was queued in memory but could not be saved.
///
/// The task stays in the queue and is written by the next successful save.
#[derive(Debug, thiserror::Error)]
#[error("task {} kept in memory only: {source}", .task.id())]
pub struct NotPersisted {
    /// The task that was queued.
    pub task: SyncTask,
    /// Why the save failed.
    #[source]
    pub source: DevsyncError,
}

/// What `mark_result` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The task moved from `Pending` to a terminal status.
    Applied,
    /// No task with that id.
    NotFound,
    /// The task was already terminal; nothing changed.
    AlreadyTerminal(TaskStatus),
}

/// Queue statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Number of pending tasks
    pub pending: usize,
    /// Number of completed tasks
    pub completed: usize,
    /// Number of failed tasks
    pub failed: usize,
    /// Oldest pending task timestamp
    pub oldest_pending: Option<DateTime<Utc>>,
}

struct Writer {
    tasks: Vec<SyncTask>,
    store: Box<dyn QueueStore>,
    /// Memory holds changes the store has not accepted yet.
    dirty: bool,
}

/// In-memory task list backed by a [`QueueStore`].
pub struct SyncTaskQueue {
    writer: Mutex<Writer>,
    published: RwLock<Arc<Vec<SyncTask>>>,
}

impl SyncTaskQueue {
    /// Open a queue over a store.
    ///
    /// A missing or unreadable store starts an empty queue; the problem is
    /// logged rather than returned.
    pub fn open(store: Box<dyn QueueStore>) -> Self {
        let tasks = match store.load() {
            Ok(tasks) => {
                debug!("loaded {} sync tasks from {}", tasks.len(), store.describe());
                tasks
            }
            Err(e) => {
                warn!("cannot load sync queue from {}, starting empty: {e}", store.describe());
                Vec::new()
            }
        };

        Self {
            published: RwLock::new(Arc::new(tasks.clone())),
            writer: Mutex::new(Writer {
                tasks,
                store,
                dirty: false,
            }),
        }
    }

    /// Append a new pending task and save the list.
    ///
    /// # Errors
    ///
    /// Returns [`NotPersisted`] when the save fails. The task is still queued.
    pub fn enqueue(&self, payload: Option<Value>) -> Result<SyncTask, NotPersisted> {
        let mut writer = self.lock_writer();

        // created_at never goes backwards, even if the wall clock does.
        let now = Utc::now();
        let created_at = writer
            .tasks
            .last()
            .map_or(now, |last| last.created_at().max(now));

        let task = SyncTask::new(payload, created_at);
        let mut next = writer.tasks.clone();
        next.push(task.clone());

        match writer.store.save(&next) {
            Ok(()) => {
                writer.dirty = false;
                debug!("enqueued sync task {}", task.id());
                self.publish(&mut writer, next);
                Ok(task)
            }
            Err(source) => {
                warn!("sync task {} not persisted: {source}", task.id());
                writer.dirty = true;
                self.publish(&mut writer, next);
                Err(NotPersisted { task, source })
            }
        }
    }

    /// Current task list in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SyncTask> {
        self.read().as_ref().clone()
    }

    /// Number of tasks still `Pending`.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.read()
            .iter()
            .filter(|t| t.status() == TaskStatus::Pending)
            .count()
    }

    /// Move a pending task to a terminal status and save.
    ///
    /// Unknown ids and already-terminal tasks are logged no-ops, so
    /// duplicate reports are harmless.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the save fails. The task then stays
    /// `Pending` in memory as well as on disk.
    pub fn mark_result(&self, id: Uuid, outcome: Outcome) -> Result<MarkOutcome, DevsyncError> {
        let mut writer = self.lock_writer();

        let Some(index) = writer.tasks.iter().position(|t| t.id() == id) else {
            warn!("mark_result: no sync task {id}");
            return Ok(MarkOutcome::NotFound);
        };

        let current = writer.tasks[index].status();
        if current.is_terminal() {
            debug!("mark_result: sync task {id} already {current}");
            return Ok(MarkOutcome::AlreadyTerminal(current));
        }

        let mut next = writer.tasks.clone();
        next[index].set_status(outcome.into());

        writer.store.save(&next)?;
        writer.dirty = false;
        self.publish(&mut writer, next);

        Ok(MarkOutcome::Applied)
    }

    /// Remove terminal tasks created before `cutoff`.
    ///
    /// Returns how many tasks were removed.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the save fails; nothing is removed then.
    pub fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, DevsyncError> {
        let mut writer = self.lock_writer();

        let next: Vec<SyncTask> = writer
            .tasks
            .iter()
            .filter(|t| !(t.status().is_terminal() && t.created_at() < cutoff))
            .cloned()
            .collect();

        let removed = writer.tasks.len() - next.len();
        if removed == 0 {
            return Ok(0);
        }

        writer.store.save(&next)?;
        writer.dirty = false;
        self.publish(&mut writer, next);

        info!("pruned {removed} terminal sync tasks");
        Ok(removed)
    }

    /// Queue statistics.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let tasks = self.read();
        let mut stats = QueueStats::default();

        for task in tasks.iter() {
            match task.status() {
                TaskStatus::Pending => {
                    stats.pending += 1;
                    if stats.oldest_pending.is_none() {
                        stats.oldest_pending = Some(task.created_at());
                    }
                }
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }

        stats
    }

    /// Save the current list, retrying any earlier failed write.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the save fails.
    pub fn flush(&self) -> Result<(), DevsyncError> {
        let mut writer = self.lock_writer();
        let Writer { tasks, store, dirty } = &mut *writer;
        store.save(tasks)?;
        *dirty = false;
        Ok(())
    }

    /// Whether memory holds changes the store has not accepted.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock_writer().dirty
    }

    /// Close the queue, flushing unsaved changes.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the final flush fails.
    pub fn close(self) -> Result<(), DevsyncError> {
        let writer = self.writer.into_inner().unwrap_or_else(PoisonError::into_inner);
        let Writer {
            tasks,
            mut store,
            dirty,
        } = writer;

        if dirty {
            store.save(&tasks)?;
            info!("flushed {} sync tasks to {} on close", tasks.len(), store.describe());
        }

        Ok(())
    }

    fn lock_writer(&self) -> std::sync::MutexGuard<'_, Writer> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Arc<Vec<SyncTask>> {
        Arc::clone(&self.published.read().unwrap_or_else(PoisonError::into_inner))
    }

    // Called with the writer lock held, so publishes happen in commit order.
    fn publish(&self, writer: &mut Writer, next: Vec<SyncTask>) {
        let shared = Arc::new(next.clone());
        writer.tasks = next;
        *self.published.write().unwrap_or_else(PoisonError::into_inner) = shared;
    }
}
