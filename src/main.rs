use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use devsync::cli::args::{Cli, Commands};
use devsync::cli::commands::{self, Context};
use devsync::config::{Config, Paths};
use devsync::logging;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let paths = match cli.home {
        Some(root) => Paths::with_root(root),
        None => Paths::new()?,
    };
    let config = Config::load_from_path(&paths.config_file)?;

    let _log_guard = logging::init(&paths, &config.logging.level)?;

    let ctx = Context {
        paths,
        config,
        format: cli.output,
    };

    let output = match cli.command {
        Commands::Status => commands::status(&ctx).await?,
        Commands::List { status, limit } => commands::list(&ctx, status, limit).await?,
        Commands::Enqueue { payload } => commands::enqueue(&ctx, payload.as_deref()).await?,
        Commands::Sync(args) => commands::sync(&ctx, &args).await?,
        Commands::Run(args) => commands::run(&ctx, &args).await?,
        Commands::Prune { older_than_days } => commands::prune(&ctx, older_than_days).await?,
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
