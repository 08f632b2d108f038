//! JSON output formatting for devsync.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error::DevsyncError;
use crate::events::StatusView;
use crate::sync::{PassReport, QueueStats, SyncTask};

/// Format tasks as JSON
///
/// # Errors
///
/// Returns `DevsyncError::Json` if JSON serialization fails.
pub fn format_tasks_json(tasks: &[SyncTask]) -> Result<String, DevsyncError> {
    let output = json!({
        "count": tasks.len(),
        "items": tasks
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format the status read model and queue counts as JSON
///
/// # Errors
///
/// Returns `DevsyncError::Json` if JSON serialization fails.
pub fn format_status_json(view: &StatusView, stats: &QueueStats) -> Result<String, DevsyncError> {
    let output = json!({
        "device": view,
        "queue": stats
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format a pass report as JSON
///
/// # Errors
///
/// Returns `DevsyncError::Json` if JSON serialization fails.
pub fn format_pass_json(report: &PassReport) -> Result<String, DevsyncError> {
    to_json(report)
}

/// Format a prune result as JSON
///
/// # Errors
///
/// Returns `DevsyncError::Json` if JSON serialization fails.
pub fn format_prune_json(removed: usize, cutoff: DateTime<Utc>) -> Result<String, DevsyncError> {
    let output = json!({
        "removed": removed,
        "cutoff": cutoff.to_rfc3339()
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Generic JSON formatter for any serializable type
///
/// # Errors
///
/// Returns `DevsyncError::Json` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, DevsyncError> {
    Ok(serde_json::to_string_pretty(value)?)
}
