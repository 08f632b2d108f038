//! Output formatting for devsync.
//!
//! This module provides formatters for displaying queue and device state in various formats.

mod json;
mod pretty;

use crate::cli::args::OutputFormat;
use crate::error::DevsyncError;
use crate::events::StatusView;
use crate::sync::{PassReport, QueueStats, SyncTask};

pub use json::*;
pub use pretty::*;

/// Format tasks based on output format
///
/// # Errors
///
/// Returns `DevsyncError::Json` if JSON serialization fails.
pub fn format_tasks(tasks: &[SyncTask], format: OutputFormat) -> Result<String, DevsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_tasks_pretty(tasks)),
        OutputFormat::Json => format_tasks_json(tasks),
    }
}

/// Format a single task based on output format
///
/// # Errors
///
/// Returns `DevsyncError::Json` if JSON serialization fails.
pub fn format_task(task: &SyncTask, format: OutputFormat) -> Result<String, DevsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_task_pretty(task)),
        OutputFormat::Json => to_json(task),
    }
}

/// Format device status and queue counts based on output format
///
/// # Errors
///
/// Returns `DevsyncError::Json` if JSON serialization fails.
pub fn format_status(
    view: &StatusView,
    stats: &QueueStats,
    format: OutputFormat,
) -> Result<String, DevsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_status_pretty(view, stats)),
        OutputFormat::Json => format_status_json(view, stats),
    }
}

/// Format a pass report based on output format
///
/// # Errors
///
/// Returns `DevsyncError::Json` if JSON serialization fails.
pub fn format_pass(report: &PassReport, format: OutputFormat) -> Result<String, DevsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_pass_pretty(report)),
        OutputFormat::Json => format_pass_json(report),
    }
}
