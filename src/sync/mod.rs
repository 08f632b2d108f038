//! Offline sync queue and scheduler.
//!
//! Work destined for the device is captured as [`SyncTask`]s in a durable
//! FIFO queue whenever the device cannot take it. The [`SyncScheduler`]
//! drains the queue on manual request, on a fixed interval and at local
//! midnight, one pass at a time.

pub mod boundary;
pub mod executor;
pub mod queue;
pub mod scheduler;
pub mod task;

pub use executor::{ExecutionResult, SyncExecutor, SyncResult};
pub use queue::{MarkOutcome, NotPersisted, QueueStats, SyncTaskQueue};
pub use scheduler::{
    PassOutcome, PassReport, SchedulerConfig, SchedulerHandle, SchedulerState, SyncScheduler,
    Trigger,
};
pub use task::{Outcome, SyncTask, TaskStatus};
