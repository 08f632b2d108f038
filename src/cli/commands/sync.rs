//! Sync command implementations.
//!
//! `sync` connects, runs one manual pass and disconnects. `run` stays
//! connected with the scheduler armed and streams log lines until Ctrl+C.

use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::Context;
use crate::cli::args::{ConnectArgs, OutputFormat};
use crate::device::{local_ip, Credentials};
use crate::error::DevsyncError;
use crate::events::{Level, LogLine};
use crate::output::format_pass;

/// Fill in login details from flags, then config, then the local IP.
fn credentials(ctx: &Context, args: &ConnectArgs) -> Result<Credentials, DevsyncError> {
    let device = &ctx.config.device;

    let address = args
        .address
        .clone()
        .filter(|a| !a.trim().is_empty())
        .or_else(|| Some(device.address.clone()).filter(|a| !a.trim().is_empty()))
        .or_else(|| local_ip().map(|ip| ip.to_string()))
        .ok_or_else(|| {
            DevsyncError::Config("no device address given and no local IP found".to_string())
        })?;

    Ok(Credentials {
        address,
        username: args
            .username
            .clone()
            .or_else(|| device.username.clone())
            .unwrap_or_default(),
        password: args
            .password
            .clone()
            .or_else(|| device.password.clone())
            .unwrap_or_default(),
    })
}

/// Execute sync command
///
/// A failed connection still queues a placeholder task, the same as a
/// manual sync while offline, and then reports the connection error.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the device rejects the
/// login, or output formatting fails.
pub async fn sync(ctx: &Context, args: &ConnectArgs) -> Result<String, DevsyncError> {
    let creds = credentials(ctx, args)?;
    let mut service = ctx.open_service()?;

    if let Err(e) = service.connect(&creds).await {
        let _ = service.request_manual_sync().await;
        service.close().await?;
        return Err(e);
    }

    let report = service.request_manual_sync().await;
    service.disconnect().await;
    service.close().await?;

    format_pass(&report?, ctx.format)
}

fn print_line(line: &LogLine, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string(line) {
            Ok(json) => println!("{json}"),
            Err(e) => warn!("cannot encode log line: {e}"),
        },
        OutputFormat::Pretty => {
            let text = line.to_string();
            match line.level {
                Level::Info => println!("{text}"),
                Level::Warn => println!("{}", text.yellow()),
                Level::Error => println!("{}", text.red()),
            }
        }
    }
}

/// Execute run command
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the device rejects the
/// login, or the final flush fails.
pub async fn run(ctx: &Context, args: &ConnectArgs) -> Result<String, DevsyncError> {
    let creds = credentials(ctx, args)?;
    let mut service = ctx.open_service()?;
    let mut lines = service.subscribe();

    if let Err(e) = service.connect(&creds).await {
        service.close().await?;
        return Err(e);
    }

    if ctx.format == OutputFormat::Pretty {
        println!("{}", "Syncing on schedule. Press Ctrl+C to stop.".dimmed());
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("received Ctrl+C, shutting down...");
                break;
            }
            line = lines.recv() => match line {
                Ok(line) => print_line(&line, ctx.format),
                Err(RecvError::Lagged(skipped)) => warn!("skipped {skipped} log lines"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    service.disconnect().await;
    while let Ok(line) = lines.try_recv() {
        print_line(&line, ctx.format);
    }
    service.close().await?;

    Ok(String::new())
}
