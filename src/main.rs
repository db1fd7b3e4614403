//! Sumi-Folio main entry point
//!
//! This is the command-line interface for the Sumi-Folio snapshot catalog builder.

use anyhow::{bail, Context};
use chrono::{Local, Utc};
use clap::Parser;
use std::path::PathBuf;
use sumi_folio::config::{load_config_with_hash, Config};
use sumi_folio::output::{load_statistics, print_plan, print_run_summary, print_statistics};
use sumi_folio::pipeline::{plan_run, run_pipeline};
use sumi_folio::schedule::{parse_daily_at, wait_until_next};
use sumi_folio::source::{DomainListFile, DomainSource};
use sumi_folio::storage::open_store;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Folio: a site snapshot catalog builder
///
/// Sumi-Folio fetches every stale domain of a list, works out its theme,
/// keywords and technologies, captures a thumbnail and keeps the results in
/// a durable catalog.
#[derive(Parser, Debug)]
#[command(name = "sumi-folio")]
#[command(version = "1.0.0")]
#[command(about = "A site snapshot catalog builder", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Clear the catalog before running
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    fresh: bool,

    /// Show which domains would be processed without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "daemon"])]
    dry_run: bool,

    /// Show statistics about the catalog and exit
    #[arg(long, conflicts_with_all = ["dry_run", "daemon"])]
    stats: bool,

    /// Keep running, once now and then daily at the scheduled time
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    daemon: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        let cancel = CancellationToken::new();
        spawn_interrupt_handler(cancel.clone());

        if cli.daemon {
            handle_daemon(config, cli.fresh, cancel).await
        } else {
            handle_run(config, cli.fresh, cancel).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_folio=info,warn"),
            1 => EnvFilter::new("sumi_folio=debug,info"),
            2 => EnvFilter::new("sumi_folio=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels `cancel` on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight domains");
            cancel.cancel();
        }
    });
}

/// Handles the --dry-run mode: shows what a run would process
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let tasks = DomainListFile::from_config(&config.input).load_tasks()?;
    let store = open_store(&config.storage)?;

    println!("Domain list: {}", config.input.domains_path.display());
    println!("Catalog: {} ({} snapshots)", store.location(), store.len());
    println!("Staleness threshold: {} days\n", config.pipeline.staleness_days);

    print_plan(&plan_run(tasks, &store, config.pipeline.staleness_days, Utc::now()));

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics about the catalog
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.storage)?;
    println!("Catalog: {}\n", store.location());

    print_statistics(&load_statistics(&store));
    Ok(())
}

/// Handles one pipeline run
async fn handle_run(config: Config, fresh: bool, cancel: CancellationToken) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh run (clearing the catalog)");
    }

    let summary = run_pipeline(config, fresh, cancel)
        .await
        .context("pipeline run failed")?;
    print_run_summary(&summary);
    Ok(())
}

/// Handles the --daemon mode: runs now, then every day at `daily-at`
async fn handle_daemon(config: Config, fresh: bool, cancel: CancellationToken) -> anyhow::Result<()> {
    let Some(at) = config.schedule.daily_at.as_deref().and_then(parse_daily_at) else {
        bail!("--daemon requires [schedule] daily-at");
    };

    let mut fresh = fresh;
    loop {
        handle_run(config.clone(), fresh, cancel.clone()).await?;
        fresh = false;

        if cancel.is_cancelled() {
            break;
        }

        let wait = wait_until_next(&Local::now(), at);
        tracing::info!("Next run in {:?} (daily at {})", wait, at.format("%H:%M"));

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => break,
        }
    }

    tracing::info!("Daemon stopped");
    Ok(())
}
