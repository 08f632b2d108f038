//! Command implementations for devsync.
//!
//! This module contains the implementation of all CLI commands.

mod sync;

pub use sync::{run, sync};

use std::sync::Arc;

use chrono::Utc;
use colored::Colorize;

use crate::cli::args::{OutputFormat, StatusFilter};
use crate::config::{retention_window, Config, Paths};
use crate::device::SimulatedLink;
use crate::error::DevsyncError;
use crate::output::{format_prune_json, format_status, format_task, format_tasks};
use crate::service::SyncService;
use crate::sync::TaskStatus;

/// Resolved paths and settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Data locations.
    pub paths: Paths,
    /// Loaded settings.
    pub config: Config,
    /// Output format.
    pub format: OutputFormat,
}

impl Context {
    /// Open a service over the configured store, driving a simulated link.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn open_service(&self) -> Result<SyncService, DevsyncError> {
        SyncService::open(&self.paths, &self.config, Arc::new(SimulatedLink::new()))
    }
}

/// Execute status command
///
/// # Errors
///
/// Returns an error if the store cannot be opened or output formatting fails.
pub async fn status(ctx: &Context) -> Result<String, DevsyncError> {
    let service = ctx.open_service()?;
    let view = service.status();
    let stats = service.queue().stats();
    service.close().await?;

    format_status(&view, &stats, ctx.format)
}

/// Execute list command
///
/// # Errors
///
/// Returns an error if the store cannot be opened or output formatting fails.
pub async fn list(
    ctx: &Context,
    status: Option<StatusFilter>,
    limit: Option<usize>,
) -> Result<String, DevsyncError> {
    let service = ctx.open_service()?;
    let wanted = status.map(TaskStatus::from);

    let tasks: Vec<_> = service
        .queue()
        .snapshot()
        .into_iter()
        .filter(|t| wanted.map_or(true, |s| t.status() == s))
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    service.close().await?;

    format_tasks(&tasks, ctx.format)
}

/// Execute enqueue command
///
/// # Errors
///
/// Returns an error if the payload is not valid JSON, the store cannot be
/// opened, or the task could not be saved.
pub async fn enqueue(ctx: &Context, payload: Option<&str>) -> Result<String, DevsyncError> {
    let payload = payload
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()?;

    let service = ctx.open_service()?;
    let queued = service.enqueue(payload);
    let close = service.close().await;

    // A task kept only in memory is lost when this process exits.
    let task = queued.map_err(|e| e.source)?;
    close?;

    format_task(&task, ctx.format)
}

/// Execute prune command
///
/// # Errors
///
/// Returns an error if the store cannot be opened or written.
pub async fn prune(ctx: &Context, older_than_days: Option<u32>) -> Result<String, DevsyncError> {
    let days = older_than_days.unwrap_or(ctx.config.sync.retention_days);
    let cutoff = Utc::now() - retention_window(days);

    let service = ctx.open_service()?;
    let removed = service.queue().prune(cutoff)?;
    service.close().await?;

    match ctx.format {
        OutputFormat::Json => format_prune_json(removed, cutoff),
        OutputFormat::Pretty => Ok(if removed == 0 {
            format!("No finished tasks older than {days} days")
        } else {
            format!(
                "{} Pruned {removed} finished tasks older than {days} days",
                "✓".green()
            )
        }),
    }
}
