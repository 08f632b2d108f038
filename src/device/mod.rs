//! Device link boundary.
//!
//! The sync core never talks to the device itself. It only asks a
//! [`DeviceLink`] whether the link is usable and hands it payloads.

mod net;
mod simulated;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{DeliveryError, DevsyncError};

pub use net::local_ip;
pub use simulated::SimulatedLink;

/// Login details for the device.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Device network address.
    pub address: String,
    /// Login name.
    pub username: String,
    /// Login secret.
    pub password: String,
}

impl Credentials {
    /// Whether every field is filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.address.trim().is_empty()
            && !self.username.trim().is_empty()
            && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An established connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionHandle {
    /// Address that was connected to.
    pub address: String,
    /// When the connection was established.
    pub since: DateTime<Utc>,
}

/// Whether the device link is currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// Link is up.
    Connected {
        /// When the link came up.
        since: DateTime<Utc>,
    },
    /// Link is down.
    Disconnected,
}

impl ConnectionState {
    /// Whether the link is up.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// When the link came up, if it is up.
    #[must_use]
    pub const fn since(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Connected { since } => Some(*since),
            Self::Disconnected => None,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected { .. } => f.write_str("Connected"),
            Self::Disconnected => f.write_str("Disconnected"),
        }
    }
}

/// Device acknowledgement of a sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// Free-form message from the device.
    pub message: String,
}

/// Capability for reaching the one managed device.
///
/// The link owns [`ConnectionState`]; the scheduler only reads it.
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Open the link.
    ///
    /// # Errors
    ///
    /// Returns [`DevsyncError::Auth`] for rejected credentials and
    /// [`DevsyncError::Connection`] when the device is unreachable.
    async fn connect(&self, credentials: &Credentials) -> Result<ConnectionHandle, DevsyncError>;

    /// Current link state.
    fn state(&self) -> ConnectionState;

    /// Whether the link is usable right now.
    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Deliver one payload. `None` is a heartbeat.
    ///
    /// May suspend for as long as the transport needs; no deadline is
    /// imposed by the caller.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the device did not acknowledge.
    async fn attempt_sync(&self, payload: Option<&Value>) -> Result<Ack, DeliveryError>;

    /// Close the link. Closing a closed link is a no-op.
    async fn disconnect(&self);
}
