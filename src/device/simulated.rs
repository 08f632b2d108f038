//! In-process device link.
//!
//! Stands in for real hardware: accepts any complete credentials and
//! acknowledges every payload while reachable.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use super::{Ack, ConnectionHandle, ConnectionState, Credentials, DeviceLink};
use crate::error::{DeliveryError, DevsyncError};

/// Simulated device link.
#[derive(Debug)]
pub struct SimulatedLink {
    state: Mutex<ConnectionState>,
    reachable: AtomicBool,
    delivered: AtomicU64,
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedLink {
    /// Create a reachable, disconnected link.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            reachable: AtomicBool::new(true),
            delivered: AtomicU64::new(0),
        }
    }

    /// Make the device (un)reachable. Going unreachable drops the link.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
        if !reachable {
            *self.lock_state() = ConnectionState::Disconnected;
        }
    }

    /// Number of acknowledged sync attempts.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DeviceLink for SimulatedLink {
    async fn connect(&self, credentials: &Credentials) -> Result<ConnectionHandle, DevsyncError> {
        if !credentials.is_complete() {
            return Err(DevsyncError::Auth(
                "address, username and password are required".to_string(),
            ));
        }
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(DevsyncError::Connection(format!(
                "{} is unreachable",
                credentials.address
            )));
        }

        let mut state = self.lock_state();
        let since = state.since().unwrap_or_else(Utc::now);
        *state = ConnectionState::Connected { since };
        info!("simulated link connected to {}", credentials.address);

        Ok(ConnectionHandle {
            address: credentials.address.clone(),
            since,
        })
    }

    fn state(&self) -> ConnectionState {
        *self.lock_state()
    }

    async fn attempt_sync(&self, payload: Option<&Value>) -> Result<Ack, DeliveryError> {
        if !self.is_connected() {
            return Err(DeliveryError::NotConnected);
        }

        self.delivered.fetch_add(1, Ordering::SeqCst);
        debug!(heartbeat = payload.is_none(), "simulated link acknowledged sync");

        Ok(Ack {
            message: "synced".to_string(),
        })
    }

    async fn disconnect(&self) {
        *self.lock_state() = ConnectionState::Disconnected;
    }
}
