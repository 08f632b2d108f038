//! Sync service.
//!
//! Wires the queue, the device link, the scheduler and the event bus
//! together. The scheduler runs while the link is connected: `connect`
//! starts it and `disconnect` stops it.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::{Config, Paths};
use crate::device::{ConnectionHandle, Credentials, DeviceLink};
use crate::error::DevsyncError;
use crate::events::{EventBus, EventKind, LogLine, StatusView};
use crate::storage::open_store;
use crate::sync::{
    NotPersisted, PassReport, SchedulerConfig, SchedulerHandle, SyncScheduler, SyncTask,
    SyncTaskQueue,
};

/// Queue, link and scheduler with an explicit lifecycle.
pub struct SyncService {
    queue: Arc<SyncTaskQueue>,
    link: Arc<dyn DeviceLink>,
    events: EventBus,
    config: SchedulerConfig,
    scheduler: Option<SyncScheduler>,
}

impl SyncService {
    /// Build a service over an already opened queue.
    #[must_use]
    pub fn new(queue: SyncTaskQueue, link: Arc<dyn DeviceLink>, config: SchedulerConfig) -> Self {
        Self {
            queue: Arc::new(queue),
            link,
            events: EventBus::default(),
            config,
            scheduler: None,
        }
    }

    /// Open the configured store under `paths` and build a service on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory or the store cannot be opened.
    pub fn open(paths: &Paths, config: &Config, link: Arc<dyn DeviceLink>) -> Result<Self, DevsyncError> {
        paths.ensure_dirs()?;
        let store = open_store(paths, config.storage.backend)?;
        let queue = SyncTaskQueue::open(store);
        Ok(Self::new(queue, link, SchedulerConfig::from(&config.sync)))
    }

    /// Receive every log line emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LogLine> {
        self.events.subscribe()
    }

    /// The event bus, for emitting lines from outer layers.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// The task queue.
    #[must_use]
    pub const fn queue(&self) -> &Arc<SyncTaskQueue> {
        &self.queue
    }

    /// Scheduler handle, while the scheduler runs.
    #[must_use]
    pub fn scheduler(&self) -> Option<SchedulerHandle> {
        self.scheduler.as_ref().map(SyncScheduler::handle)
    }

    /// Status read model.
    #[must_use]
    pub fn status(&self) -> StatusView {
        StatusView::new(self.link.state(), self.queue.pending_count(), Utc::now())
    }

    /// Queue work for the device.
    ///
    /// # Errors
    ///
    /// Returns [`NotPersisted`] if the task could not be saved. It is still
    /// queued in memory.
    pub fn enqueue(&self, payload: Option<Value>) -> Result<SyncTask, NotPersisted> {
        let task = self.queue.enqueue(payload)?;
        self.events
            .info(EventKind::Queue, format!("Queued task {}", task.id()));
        Ok(task)
    }

    /// Connect to the device and start the scheduler.
    ///
    /// # Errors
    ///
    /// Returns the link's auth or connection error. Queued tasks are not
    /// touched on failure.
    pub async fn connect(&mut self, credentials: &Credentials) -> Result<ConnectionHandle, DevsyncError> {
        self.events.info(
            EventKind::Connection,
            format!("Connecting to {}...", credentials.address),
        );

        let handle = match self.link.connect(credentials).await {
            Ok(handle) => handle,
            Err(e) => {
                self.events
                    .error(EventKind::Connection, format!("Connection failed: {e}"));
                return Err(e);
            }
        };

        self.events.info(
            EventKind::Connection,
            format!("Connected to {}", handle.address),
        );

        if self.scheduler.is_none() {
            self.scheduler = Some(SyncScheduler::start(
                Arc::clone(&self.queue),
                Arc::clone(&self.link),
                self.events.clone(),
                &self.config,
            ));
        }

        Ok(handle)
    }

    /// "Sync now".
    ///
    /// # Errors
    ///
    /// Returns [`DevsyncError::SchedulerStopped`] if the link is up but the
    /// scheduler is not running.
    pub async fn request_manual_sync(&self) -> Result<PassReport, DevsyncError> {
        match &self.scheduler {
            Some(scheduler) => scheduler.handle().request_manual_sync().await,
            None if !self.link.is_connected() => {
                Ok(PassReport::offline(&self.queue, &self.events))
            }
            None => Err(DevsyncError::SchedulerStopped),
        }
    }

    /// Flush pending work if possible, stop the scheduler and drop the link.
    ///
    /// Returns the report of the final manual pass, if one ran.
    pub async fn disconnect(&mut self) -> Option<PassReport> {
        let mut last_pass = None;

        if self.link.is_connected() && self.queue.pending_count() > 0 {
            self.events.info(
                EventKind::Connection,
                "Syncing pending tasks before disconnecting",
            );
            match self.request_manual_sync().await {
                Ok(report) => last_pass = Some(report),
                Err(e) => self
                    .events
                    .warn(EventKind::Connection, format!("Final sync skipped: {e}")),
            }
        }

        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop().await;
        }

        self.link.disconnect().await;
        self.events.info(EventKind::Connection, "Disconnected");

        last_pass
    }

    /// Shut down: stop the scheduler, drop the link and flush the queue.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the final flush fails.
    pub async fn close(mut self) -> Result<(), DevsyncError> {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop().await;
        }
        self.link.disconnect().await;

        match Arc::try_unwrap(self.queue) {
            Ok(queue) => queue.close(),
            Err(shared) => {
                debug!("queue still shared at close, flushing instead");
                if shared.is_dirty() {
                    shared.flush()
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::config::StorageBackend;
    use crate::device::SimulatedLink;
    use crate::storage::MemoryStore;
    use crate::sync::{PassOutcome, SchedulerState, TaskStatus};

    fn creds() -> Credentials {
        Credentials {
            address: "10.0.0.2".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    fn quiet() -> SchedulerConfig {
        SchedulerConfig {
            interval: std::time::Duration::from_secs(600),
            daily_boundary: false,
            retention: None,
        }
    }

    fn memory_service(link: Arc<SimulatedLink>) -> SyncService {
        let queue = SyncTaskQueue::open(Box::new(MemoryStore::new()));
        SyncService::new(queue, link, quiet())
    }

    #[tokio::test]
    async fn test_offline_backlog_then_connect_and_sync() {
        let link = Arc::new(SimulatedLink::new());
        let mut service = memory_service(Arc::clone(&link));

        for n in 0..3 {
            service.enqueue(Some(json!({ "n": n }))).unwrap();
        }
        let report = service.request_manual_sync().await.unwrap();
        assert!(matches!(report.outcome, PassOutcome::Offline { .. }));
        assert_eq!(service.status().pending_count, 4);
        assert_eq!(service.status().device_status, "Disconnected");

        service.connect(&creds()).await.unwrap();
        let report = service.request_manual_sync().await.unwrap();

        let PassOutcome::Drained(result) = report.outcome else {
            panic!("expected a drained pass");
        };
        assert_eq!(result.succeeded, 4);
        assert_eq!(service.status().pending_count, 0);
        assert_eq!(service.status().device_status, "Connected");
        // Heartbeat plus four tasks.
        assert_eq!(link.delivered(), 5);

        service.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_queue_alone() {
        let link = Arc::new(SimulatedLink::new());
        let mut service = memory_service(Arc::clone(&link));
        service.enqueue(None).unwrap();

        let err = service.connect(&Credentials::default()).await.unwrap_err();

        assert!(matches!(err, DevsyncError::Auth(_)));
        assert!(service.scheduler().is_none());
        assert_eq!(service.queue().pending_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_flushes_pending_work() {
        let link = Arc::new(SimulatedLink::new());
        let mut service = memory_service(Arc::clone(&link));
        service.connect(&creds()).await.unwrap();
        let handle = service.scheduler().unwrap();
        let task = service.enqueue(Some(json!({"late": true}))).unwrap();

        let report = service.disconnect().await;

        assert!(report.is_some());
        assert_eq!(handle.state(), SchedulerState::Stopped);
        assert!(service.scheduler().is_none());
        assert!(!link.is_connected());
        let stored = service
            .queue()
            .snapshot()
            .into_iter()
            .find(|t| t.id() == task.id())
            .unwrap();
        assert_eq!(stored.status(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_disconnect_without_pending_work_skips_pass() {
        let link = Arc::new(SimulatedLink::new());
        let mut service = memory_service(Arc::clone(&link));
        service.connect(&creds()).await.unwrap();

        assert!(service.disconnect().await.is_none());
        assert_eq!(link.delivered(), 0);
    }

    #[tokio::test]
    async fn test_events_cover_connection_and_pass() {
        let link = Arc::new(SimulatedLink::new());
        let mut service = memory_service(link);
        let mut rx = service.subscribe();

        service.connect(&creds()).await.unwrap();
        service.request_manual_sync().await.unwrap();
        service.disconnect().await;

        let mut kinds = Vec::new();
        while let Ok(line) = rx.try_recv() {
            kinds.push(line.kind);
        }
        assert_eq!(kinds.first(), Some(&EventKind::Connection));
        assert!(kinds.contains(&EventKind::PassStarted));
        assert!(kinds.contains(&EventKind::PassFinished));
        assert_eq!(kinds.last(), Some(&EventKind::Connection));
    }

    #[tokio::test]
    async fn test_open_persists_across_services() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_root(dir.path().to_path_buf());

        for backend in [StorageBackend::Sqlite, StorageBackend::Json] {
            let mut config = Config::default();
            config.storage.backend = backend;

            let service = SyncService::open(&paths, &config, Arc::new(SimulatedLink::new())).unwrap();
            let task = service.enqueue(Some(json!({"keep": "me"}))).unwrap();
            service.close().await.unwrap();

            let reopened = SyncService::open(&paths, &config, Arc::new(SimulatedLink::new())).unwrap();
            let ids: Vec<_> = reopened.queue().snapshot().iter().map(SyncTask::id).collect();
            assert!(ids.contains(&task.id()), "{backend:?} lost the task");
            reopened.close().await.unwrap();
        }
    }
}
