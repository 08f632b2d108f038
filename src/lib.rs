//! devsync - offline sync queue and scheduler for a single remote device
//!
//! Work for the device is captured as durable sync tasks while the device is
//! unreachable and delivered by a scheduler that runs passes on demand, on a
//! fixed interval and at local midnight.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod logging;
pub mod output;
pub mod service;
pub mod storage;
pub mod sync;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use device::{ConnectionState, Credentials, DeviceLink, SimulatedLink};
pub use error::{DeliveryError, DevsyncError};
pub use events::{EventBus, LogLine, StatusView};
pub use service::SyncService;
pub use sync::{SyncScheduler, SyncTask, SyncTaskQueue, TaskStatus, Trigger};
