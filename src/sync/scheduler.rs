//! Sync scheduler.
//!
//! Three trigger sources (manual, fixed interval, local midnight) feed one
//! driver task that runs sync passes strictly one at a time. A trigger that
//! arrives while a pass is running is folded into a single follow-up pass.
//!
//! ```text
//!   Idle --trigger--> RunningPass --done, nothing requested--> Idle
//!                       |   ^
//!                       +---+  done, re-run requested during the pass
//! ```
//!
//! Stopping cancels the timers and lets an in-flight pass finish; no pass
//! starts after that.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::boundary::{until_next_midnight, DAY};
use super::executor::{SyncExecutor, SyncResult};
use super::queue::SyncTaskQueue;
use crate::config::SyncConfig;
use crate::device::DeviceLink;
use crate::error::DevsyncError;
use crate::events::{EventBus, EventKind};

/// What asked for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// User action.
    Manual,
    /// Fixed-interval timer.
    Interval,
    /// Local-midnight timer.
    DailyBoundary,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Interval => "interval",
            Self::DailyBoundary => "daily",
        })
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Waiting for a trigger.
    Idle,
    /// A pass is running.
    RunningPass,
    /// Stopped; triggers are ignored.
    Stopped,
}

/// Scheduler policy.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Fixed-interval period.
    pub interval: Duration,
    /// Arm the local-midnight trigger.
    pub daily_boundary: bool,
    /// Prune terminal tasks older than this on each daily firing.
    pub retention: Option<chrono::Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SchedulerConfig {
    fn from(sync: &SyncConfig) -> Self {
        Self {
            interval: sync.interval(),
            daily_boundary: sync.daily_boundary,
            retention: Some(sync.retention()),
        }
    }
}

/// How a pass ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassOutcome {
    /// Link was down; a placeholder task was queued instead.
    Offline {
        /// The placeholder task.
        placeholder: Uuid,
    },
    /// The manual heartbeat failed; a placeholder task was queued instead.
    HeartbeatFailed {
        /// Delivery error text.
        error: String,
        /// The placeholder task.
        placeholder: Uuid,
    },
    /// Pending tasks were attempted.
    Drained(SyncResult),
}

/// Summary of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    /// Trigger the pass ran for. Coalesced manual requests win.
    pub trigger: Trigger,
    /// When the pass began.
    pub started_at: DateTime<Utc>,
    /// When the pass ended.
    pub finished_at: DateTime<Utc>,
    /// Terminal tasks removed by retention.
    pub pruned: usize,
    /// Result.
    pub outcome: PassOutcome,
}

impl PassReport {
    /// Manual request answered without a pass because the link is down.
    pub(crate) fn offline(queue: &SyncTaskQueue, events: &EventBus) -> Self {
        let now = Utc::now();
        Self {
            trigger: Trigger::Manual,
            started_at: now,
            finished_at: now,
            pruned: 0,
            outcome: PassOutcome::Offline {
                placeholder: queue_placeholder(queue, events),
            },
        }
    }
}

/// Queue a heartbeat task standing in for work the device could not take.
fn queue_placeholder(queue: &SyncTaskQueue, events: &EventBus) -> Uuid {
    match queue.enqueue(None) {
        Ok(task) => {
            events.info(
                EventKind::Queue,
                format!("Device unavailable, queued task {}", task.id()),
            );
            task.id()
        }
        Err(e) => {
            events.warn(EventKind::Queue, e.to_string());
            e.task.id()
        }
    }
}

/// Triggers collected while no pass has picked them up yet.
#[derive(Default)]
struct Request {
    manual: bool,
    daily: bool,
    interval: bool,
    waiters: Vec<oneshot::Sender<PassReport>>,
}

impl Request {
    fn add(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::Manual => self.manual = true,
            Trigger::Interval => self.interval = true,
            Trigger::DailyBoundary => self.daily = true,
        }
    }

    fn is_empty(&self) -> bool {
        !(self.manual || self.daily || self.interval)
    }

    const fn primary(&self) -> Trigger {
        if self.manual {
            Trigger::Manual
        } else if self.daily {
            Trigger::DailyBoundary
        } else {
            Trigger::Interval
        }
    }
}

struct Gate {
    state: SchedulerState,
    request: Request,
}

struct Core {
    queue: Arc<SyncTaskQueue>,
    link: Arc<dyn DeviceLink>,
    events: EventBus,
    retention: Option<chrono::Duration>,
    gate: Mutex<Gate>,
    wake: Notify,
    cancel: CancellationToken,
    passes: AtomicU64,
}

impl Core {
    fn lock_gate(&self) -> std::sync::MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a trigger. Returns false once the scheduler is stopping.
    fn request(&self, trigger: Trigger, waiter: Option<oneshot::Sender<PassReport>>) -> bool {
        if self.cancel.is_cancelled() {
            debug!("{trigger} trigger ignored, scheduler stopping");
            return false;
        }

        {
            let mut gate = self.lock_gate();
            if gate.state == SchedulerState::Stopped {
                return false;
            }
            if !gate.request.is_empty() || gate.state == SchedulerState::RunningPass {
                debug!("{trigger} trigger coalesced");
            }
            gate.request.add(trigger);
            gate.request.waiters.extend(waiter);
        }

        self.wake.notify_one();
        true
    }

    fn begin_pass(&self) -> Option<Request> {
        let mut gate = self.lock_gate();
        if gate.request.is_empty() {
            gate.state = SchedulerState::Idle;
            return None;
        }
        gate.state = SchedulerState::RunningPass;
        Some(std::mem::take(&mut gate.request))
    }

    fn shut(&self) {
        let mut gate = self.lock_gate();
        gate.state = SchedulerState::Stopped;
        // Dropping the senders tells manual callers the pass never ran.
        gate.request = Request::default();
    }

    async fn drive(self: Arc<Self>) {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = self.wake.notified() => {}
            }

            while let Some(request) = self.begin_pass() {
                let report = self.run_pass(request.primary()).await;
                for waiter in request.waiters {
                    let _ = waiter.send(report.clone());
                }
                if self.cancel.is_cancelled() {
                    break;
                }
            }
        }

        self.shut();
        self.events.info(EventKind::Scheduler, "Scheduler stopped");
    }

    async fn run_pass(&self, trigger: Trigger) -> PassReport {
        let started_at = Utc::now();
        self.events
            .info(EventKind::PassStarted, format!("Sync pass started ({trigger})"));

        let pruned = if trigger == Trigger::DailyBoundary {
            self.apply_retention()
        } else {
            0
        };

        let outcome = self.pass_outcome(trigger).await;

        let summary = match &outcome {
            PassOutcome::Offline { .. } => "device offline, task queued".to_string(),
            PassOutcome::HeartbeatFailed { .. } => "heartbeat failed, task queued".to_string(),
            PassOutcome::Drained(result) => format!(
                "{} synced, {} failed",
                result.succeeded, result.failed
            ),
        };
        self.passes.fetch_add(1, Ordering::SeqCst);
        self.events.info(
            EventKind::PassFinished,
            format!("Sync pass finished ({trigger}): {summary}"),
        );

        PassReport {
            trigger,
            started_at,
            finished_at: Utc::now(),
            pruned,
            outcome,
        }
    }

    async fn pass_outcome(&self, trigger: Trigger) -> PassOutcome {
        if !self.link.is_connected() {
            return PassOutcome::Offline {
                placeholder: self.enqueue_placeholder(),
            };
        }

        // "Sync now" pings the device before flushing the backlog.
        if trigger == Trigger::Manual {
            if let Err(e) = self.link.attempt_sync(None).await {
                self.events
                    .warn(EventKind::Task, format!("Manual sync failed: {e}"));
                return PassOutcome::HeartbeatFailed {
                    error: e.to_string(),
                    placeholder: self.enqueue_placeholder(),
                };
            }
        }

        let snapshot = self.queue.snapshot();
        let executor = SyncExecutor::new(&self.queue, self.link.as_ref(), &self.events);
        PassOutcome::Drained(executor.execute_all(&snapshot).await)
    }

    fn enqueue_placeholder(&self) -> Uuid {
        queue_placeholder(&self.queue, &self.events)
    }

    fn apply_retention(&self) -> usize {
        let Some(retention) = self.retention else {
            return 0;
        };

        match self.queue.prune(Utc::now() - retention) {
            Ok(0) => 0,
            Ok(removed) => {
                self.events.info(
                    EventKind::Queue,
                    format!("Pruned {removed} finished tasks"),
                );
                removed
            }
            Err(e) => {
                self.events
                    .warn(EventKind::Queue, format!("Retention pass failed: {e}"));
                0
            }
        }
    }
}

/// Cloneable handle for firing triggers and reading scheduler state.
#[derive(Clone)]
pub struct SchedulerHandle {
    core: Arc<Core>,
}

impl SchedulerHandle {
    /// Request a pass without waiting for it.
    ///
    /// Returns false if the scheduler is stopping or stopped.
    pub fn trigger(&self, trigger: Trigger) -> bool {
        self.core.request(trigger, None)
    }

    /// "Sync now".
    ///
    /// While disconnected this queues a placeholder task and returns at
    /// once. While connected it runs a manual pass (heartbeat, then the
    /// whole pending backlog) and returns its report.
    ///
    /// # Errors
    ///
    /// Returns [`DevsyncError::SchedulerStopped`] if the scheduler stops
    /// before the pass runs.
    pub async fn request_manual_sync(&self) -> Result<PassReport, DevsyncError> {
        if !self.core.link.is_connected() {
            if self.core.cancel.is_cancelled() {
                return Err(DevsyncError::SchedulerStopped);
            }
            return Ok(PassReport::offline(&self.core.queue, &self.core.events));
        }

        let (tx, rx) = oneshot::channel();
        if !self.core.request(Trigger::Manual, Some(tx)) {
            return Err(DevsyncError::SchedulerStopped);
        }
        rx.await.map_err(|_| DevsyncError::SchedulerStopped)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.core.lock_gate().state
    }

    /// Number of passes run so far.
    #[must_use]
    pub fn completed_passes(&self) -> u64 {
        self.core.passes.load(Ordering::SeqCst)
    }
}

/// Running scheduler. Owns the driver and timer tasks.
pub struct SyncScheduler {
    core: Arc<Core>,
    driver: JoinHandle<()>,
    timers: Vec<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Start the driver and arm the timers. Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(
        queue: Arc<SyncTaskQueue>,
        link: Arc<dyn DeviceLink>,
        events: EventBus,
        config: &SchedulerConfig,
    ) -> Self {
        let core = Arc::new(Core {
            queue,
            link,
            events,
            retention: config.retention,
            gate: Mutex::new(Gate {
                state: SchedulerState::Idle,
                request: Request::default(),
            }),
            wake: Notify::new(),
            cancel: CancellationToken::new(),
            passes: AtomicU64::new(0),
        });

        let driver = tokio::spawn(Arc::clone(&core).drive());

        let mut timers = vec![spawn_ticker(
            Arc::clone(&core),
            Trigger::Interval,
            config.interval,
            config.interval,
        )];
        if config.daily_boundary {
            let first = until_next_midnight(&Local::now());
            timers.push(spawn_ticker(
                Arc::clone(&core),
                Trigger::DailyBoundary,
                first,
                DAY,
            ));
            info!("daily sync armed, first firing in {}s", first.as_secs());
        }

        core.events.info(
            EventKind::Scheduler,
            format!(
                "Scheduler started (every {} min{})",
                config.interval.as_secs() / 60,
                if config.daily_boundary { ", daily at midnight" } else { "" }
            ),
        );

        Self {
            core,
            driver,
            timers,
        }
    }

    /// Handle for triggers and state.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            core: Arc::clone(&self.core),
        }
    }

    /// Stop the scheduler.
    ///
    /// Cancels every timer, lets a running pass finish, and returns once
    /// the scheduler is inert.
    pub async fn stop(self) {
        self.core.cancel.cancel();

        for timer in self.timers {
            let _ = timer.await;
        }
        if let Err(e) = self.driver.await {
            tracing::error!("scheduler driver ended abnormally: {e}");
            self.core.shut();
        }
    }
}

/// Fire `trigger` after `first`, then every `period`, until cancelled.
///
/// The timer never waits for passes; a slow pass only coalesces ticks.
fn spawn_ticker(core: Arc<Core>, trigger: Trigger, first: Duration, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = core.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    debug!("{trigger} timer fired");
                    core.request(trigger, None);
                }
            }
        }
    })
}
