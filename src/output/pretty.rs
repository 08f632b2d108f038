use chrono::Utc;
use colored::Colorize;

use crate::events::StatusView;
use crate::sync::{PassOutcome, PassReport, QueueStats, SyncResult, SyncTask, TaskStatus};

fn status_icon(status: TaskStatus) -> colored::ColoredString {
    match status {
        TaskStatus::Pending => "[ ]".white(),
        TaskStatus::Completed => "[x]".green(),
        TaskStatus::Failed => "[!]".red(),
    }
}

fn describe_payload(task: &SyncTask) -> String {
    task.payload()
        .map_or_else(|| "heartbeat".to_string(), ToString::to_string)
}

/// Format a list of tasks as a pretty table
pub fn format_tasks_pretty(tasks: &[SyncTask]) -> String {
    if tasks.is_empty() {
        return "Sync tasks (0 items)\n  No items".to_string();
    }

    let mut output = format!("Sync tasks ({} items)\n", tasks.len());
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for task in tasks {
        let line = format!(
            "{} {}  {}  {}",
            status_icon(task.status()),
            task.id().to_string().bold(),
            task.created_at()
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed(),
            describe_payload(task).cyan()
        );
        output.push_str(&line);
        output.push('\n');
    }

    output
}

/// Format a single task as pretty output
pub fn format_task_pretty(task: &SyncTask) -> String {
    let mut output = format!("{} {}\n", status_icon(task.status()), task.id().to_string().bold());
    output.push_str(&format!("  {}: {}\n", "Status".dimmed(), task.status()));
    output.push_str(&format!("  {}: {}\n", "Created".dimmed(), task.created_at().to_rfc3339()));
    output.push_str(&format!("  {}: {}", "Payload".dimmed(), describe_payload(task)));
    output
}

/// Format device status and queue counts
pub fn format_status_pretty(view: &StatusView, stats: &QueueStats) -> String {
    let mut lines = Vec::new();

    lines.push("Device".bold().to_string());
    lines.push("─".repeat(40));
    let status = if view.connected_since.is_some() {
        view.device_status.green()
    } else {
        view.device_status.yellow()
    };
    lines.push(format!("  Status:     {status}"));
    lines.push(format!("  Connected:  {}", view.connection_duration));

    lines.push(String::new());
    lines.push("Sync Queue".bold().to_string());
    lines.push("─".repeat(40));
    lines.push(format!(
        "  Pending:    {} {}",
        stats.pending,
        if stats.pending > 0 {
            "tasks waiting".dimmed()
        } else {
            "".dimmed()
        }
    ));
    lines.push(format!("  Completed:  {} {}", stats.completed, "tasks".dimmed()));
    lines.push(format!(
        "  Failed:     {} {}",
        stats.failed,
        if stats.failed > 0 {
            "tasks need attention".red()
        } else {
            "".normal()
        }
    ));

    if let Some(oldest) = stats.oldest_pending {
        let age = Utc::now().signed_duration_since(oldest);
        let age_str = if age.num_hours() > 0 {
            format!("{} hours ago", age.num_hours())
        } else if age.num_minutes() > 0 {
            format!("{} minutes ago", age.num_minutes())
        } else {
            "just now".to_string()
        };
        lines.push(format!("  Oldest:     {}", age_str.dimmed()));
    }

    if stats.pending > 0 {
        lines.push(String::new());
        lines.push(
            "Run 'devsync sync' to deliver pending tasks"
                .dimmed()
                .to_string(),
        );
    }

    lines.join("\n")
}

/// Format a sync result for display.
pub fn format_sync_result(result: &SyncResult) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Sync completed: {} tasks", result.total()));
    lines.push("─".repeat(40));

    if result.succeeded > 0 {
        lines.push(format!(
            "  {} {}",
            "✓".green(),
            format!("{} succeeded", result.succeeded).green()
        ));
    }

    if result.failed > 0 {
        lines.push(format!(
            "  {} {}",
            "✗".red(),
            format!("{} failed", result.failed).red()
        ));
    }

    let unrecorded = result.unrecorded();
    if unrecorded > 0 {
        lines.push(format!(
            "  {} {}",
            "○".yellow(),
            format!("{unrecorded} not saved, will retry").yellow()
        ));
    }

    // Show first few errors
    let errors: Vec<_> = result
        .results
        .iter()
        .filter_map(|r| r.error.as_ref().map(|e| (r.id, e)))
        .take(3)
        .collect();

    if !errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors:".to_string());
        for (id, error) in &errors {
            lines.push(format!("  {}: {}", id.to_string().dimmed(), error.red()));
        }
        if result.failed > errors.len() {
            lines.push(format!("  ... and {} more", result.failed - errors.len()));
        }
    }

    lines.join("\n")
}

/// Format a pass report for display.
pub fn format_pass_pretty(report: &PassReport) -> String {
    let mut output = match &report.outcome {
        PassOutcome::Offline { placeholder } => format!(
            "{} device offline, queued task {}",
            "○".yellow(),
            placeholder.to_string().bold()
        ),
        PassOutcome::HeartbeatFailed { error, placeholder } => format!(
            "{} manual sync failed: {}\n  queued task {}",
            "✗".red(),
            error.red(),
            placeholder.to_string().bold()
        ),
        PassOutcome::Drained(result) => format_sync_result(result),
    };

    if report.pruned > 0 {
        output.push_str(&format!("\n  {} finished tasks pruned", report.pruned));
    }

    output
}
