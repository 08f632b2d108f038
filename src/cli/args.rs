use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::sync::TaskStatus;

#[derive(Parser)]
#[command(name = "devsync")]
#[command(about = "Offline sync queue and scheduler for a single remote device")]
#[command(long_about = "devsync - keep work for a remote device safe while it is offline

Work for the device is queued durably and delivered on demand, every few
minutes while connected, and once a day at local midnight.

QUICK START:
  devsync enqueue --payload '{\"cmd\":\"reboot\"}'   Queue work
  devsync status                                  Show device and queue state
  devsync sync --username admin --password ...    Connect and sync now
  devsync run --username admin --password ...     Stay connected and sync on schedule

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  devsync <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output (default),
    /// or 'json' for machine-readable output suitable for scripting.
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub output: OutputFormat,

    /// Data directory (defaults to ~/.devsync)
    #[arg(long, env = "DEVSYNC_HOME", global = true)]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show device status and queue counts
    #[command(alias = "st")]
    Status,

    /// List queued tasks in creation order
    ///
    /// # Examples
    ///
    ///   devsync list
    ///   devsync list --status failed
    ///   devsync list --status pending --limit 5
    #[command(alias = "ls")]
    List {
        /// Only show tasks with this status
        #[arg(short, long, value_enum)]
        status: Option<StatusFilter>,

        /// Show at most this many tasks
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Queue work for the device
    ///
    /// Without a payload the task is a heartbeat sync.
    ///
    /// # Examples
    ///
    ///   devsync enqueue
    ///   devsync enqueue --payload '{"cmd": "set-volume", "level": 4}'
    #[command(alias = "add")]
    Enqueue {
        /// JSON payload to deliver
        #[arg(short, long)]
        payload: Option<String>,
    },

    /// Connect and sync now
    ///
    /// Sends a heartbeat to the device, then delivers every pending task
    /// in creation order. If the device cannot be reached a placeholder
    /// task is queued instead.
    Sync(ConnectArgs),

    /// Stay connected and sync on schedule until Ctrl+C
    ///
    /// Syncs every `sync.interval_minutes` and at local midnight, printing
    /// log lines as they happen.
    Run(ConnectArgs),

    /// Remove finished tasks older than the retention window
    ///
    /// Pending tasks are never removed.
    Prune {
        /// Retention window in days (defaults to sync.retention_days)
        #[arg(long)]
        older_than_days: Option<u32>,
    },
}

/// Device login arguments. Missing values fall back to config.yaml.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// Device address (defaults to device.address, then the local IP)
    #[arg(short, long)]
    pub address: Option<String>,

    /// Login name
    #[arg(short, long)]
    pub username: Option<String>,

    /// Login secret
    #[arg(short, long, env = "DEVSYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Task status filter for `list`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Completed,
    Failed,
}

impl From<StatusFilter> for TaskStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Pending => Self::Pending,
            StatusFilter::Completed => Self::Completed,
            StatusFilter::Failed => Self::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_output_format_default() {
        let cli = Cli::try_parse_from(["devsync", "status"]).unwrap();
        assert!(matches!(cli.output, OutputFormat::Pretty));
    }

    #[test]
    fn test_cli_output_format_json() {
        let cli = Cli::try_parse_from(["devsync", "--output", "json", "status"]).unwrap();
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn test_cli_output_format_short_after_subcommand() {
        let cli = Cli::try_parse_from(["devsync", "list", "-o", "json"]).unwrap();
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn test_cli_list_filters() {
        let cli =
            Cli::try_parse_from(["devsync", "list", "--status", "failed", "--limit", "5"]).unwrap();
        if let Commands::List { status, limit } = cli.command {
            assert_eq!(status, Some(StatusFilter::Failed));
            assert_eq!(limit, Some(5));
        } else {
            panic!("Expected List command");
        }
    }

    #[test]
    fn test_cli_enqueue_payload() {
        let cli = Cli::try_parse_from(["devsync", "enqueue", "--payload", r#"{"a":1}"#]).unwrap();
        if let Commands::Enqueue { payload } = cli.command {
            assert_eq!(payload.as_deref(), Some(r#"{"a":1}"#));
        } else {
            panic!("Expected Enqueue command");
        }
    }

    #[test]
    fn test_cli_sync_credentials() {
        let cli = Cli::try_parse_from([
            "devsync", "sync", "--address", "10.0.0.2", "-u", "admin", "-p", "secret",
        ])
        .unwrap();
        if let Commands::Sync(args) = cli.command {
            assert_eq!(args.address.as_deref(), Some("10.0.0.2"));
            assert_eq!(args.username.as_deref(), Some("admin"));
            assert_eq!(args.password.as_deref(), Some("secret"));
        } else {
            panic!("Expected Sync command");
        }
    }

    #[test]
    fn test_cli_prune_days() {
        let cli = Cli::try_parse_from(["devsync", "prune", "--older-than-days", "7"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Prune {
                older_than_days: Some(7)
            }
        ));
    }

    #[test]
    fn test_status_filter_maps_to_task_status() {
        assert_eq!(TaskStatus::from(StatusFilter::Completed), TaskStatus::Completed);
    }

    #[test]
    fn test_output_format_default() {
        assert!(matches!(OutputFormat::default(), OutputFormat::Pretty));
    }
}
