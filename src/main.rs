//! Minima main entry point
//!
//! This is the command-line interface for the Minima crawl/scrape pipeline.

use anyhow::Context;
use clap::Parser;
use minima::config::{compute_config_hash, load_config_or_default, Config};
use minima::output::{print_frontier_status, print_statistics};
use minima::storage::inspect_frontier;
use minima::{Coordinator, RunStatus};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Minima: a resumable crawl/scrape pipeline
///
/// Minima fetches seed addresses, extracts their content, optionally follows
/// links up to a depth limit, and exports results as JSON, CSV and SQLite.
/// Interrupted runs resume from the persisted frontier.
#[derive(Parser, Debug)]
#[command(name = "minima")]
#[command(version = "1.0.0")]
#[command(about = "A resumable crawl/scrape pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file; defaults apply when it is missing
    #[arg(value_name = "CONFIG", default_value = "minima.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Clear the persisted frontier before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["status", "fresh"])]
    dry_run: bool,

    /// Show the persisted frontier and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    status: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config_or_default(&cli.config);
    if let Ok(hash) = compute_config_hash(&cli.config) {
        tracing::info!("Configuration hash: {}", hash);
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.status {
        handle_status(&config);
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("minima=info,warn"),
            1 => EnvFilter::new("minima=debug,info"),
            2 => EnvFilter::new("minima=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Minima Dry Run ===\n");

    println!("Crawler:");
    println!("  Mode: {:?}", config.crawler.mode);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Scoring: {:?}", config.crawler.scoring);
    println!("  Delay: {}ms", config.crawler.delay_ms);
    if config.crawler.accept_languages.is_empty() {
        println!("  Languages: any");
    } else {
        println!("  Languages: {}", config.crawler.normalized_languages().join(", "));
    }
    println!("  Plugins: {}", config.crawler.plugins.join(", "));

    println!("\nFetch:");
    println!("  Workers: {}", config.fetch.max_workers);
    println!("  Retries: {}", config.fetch.retries);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    for (name, value) in &config.fetch.headers {
        println!("  {}: {}", name, value);
    }

    println!("\nStorage:");
    println!("  Frontier: {}", config.frontier.path.display());
    println!("  Exports: {}", config.output.export_dir.display());
    println!("  Store: {}", config.output.store_dir.display());

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --status mode: shows the persisted frontier
fn handle_status(config: &Config) {
    println!("Frontier: {}\n", config.frontier.path.display());
    let frontier = inspect_frontier(&config.frontier);
    print_frontier_status(&frontier);
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let listener = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, flushing and stopping");
            listener.cancel();
        }
    });

    let mut coordinator =
        Coordinator::new(config, fresh).context("Failed to initialize crawler")?;
    coordinator.seed();

    let status = coordinator.run(cancel).await.context("Crawl failed")?;
    print_statistics(coordinator.statistics());

    if status == RunStatus::Interrupted {
        println!("\nInterrupted: rerun to resume from the saved frontier");
    }

    Ok(())
}
