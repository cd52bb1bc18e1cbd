//! Steamer main entry point
//!
//! This is the command-line interface for the Steamer friend-graph crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use steamer::config::{load_config_with_hash, Config};
use steamer::crawler::crawl;
use steamer::output::{load_statistics, print_statistics};
use steamer::storage::open_storage;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Steamer: a resumable friend-graph crawler
///
/// Steamer expands the Steam friend graph breadth-first from a seed account,
/// storing nodes and edges in SQLite. Several workers share the database as
/// a work queue; an interrupted crawl picks up where it left off.
#[derive(Parser, Debug)]
#[command(name = "steamer")]
#[command(version)]
#[command(about = "A resumable friend-graph crawler", long_about = None)]
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

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("steamer=info,warn"),
            1 => EnvFilter::new("steamer=debug,info"),
            2 => EnvFilter::new("steamer=trace,debug"),
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

/// Shows only the first and last few characters of a secret
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Steamer Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed node: {}", config.crawler.seed_id);
    println!("  Workers: {}", config.crawler.max_workers);
    println!("  Lease timeout: {}s", config.crawler.lease_timeout_secs);
    match config.crawler.run_duration() {
        Some(duration) => println!("  Run duration: {} minutes", duration.as_secs() / 60),
        None => println!("  Run duration: until interrupted"),
    }
    println!("  Idle backoff: {}ms", config.crawler.idle_backoff_ms);

    println!("\nAPI:");
    println!("  Base URL: {}", config.api.base_url);
    println!(
        "  Key: {}",
        config.api.key.as_deref().map(mask_secret).unwrap_or_default()
    );
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.api.request_timeout_secs, config.api.connect_timeout_secs
    );
    if config.api.accept_invalid_certs {
        println!("  Certificate verification: disabled");
    }

    match &config.proxy {
        Some(proxy) => {
            println!("\nProxy:");
            println!("  Address: {}", proxy.url());
            if let Some(username) = &proxy.username {
                println!("  User: {}", username);
            }
        }
        None => println!("\nProxy: none"),
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage).context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, waiting for workers to finish");
            on_interrupt.cancel();
        }
    });

    tracing::info!(
        "Crawling from node {} into {}",
        config.crawler.seed_id,
        config.output.database_path
    );

    match crawl(config, config_hash, shutdown).await {
        Ok(report) => {
            tracing::info!(
                "Crawl finished: {} nodes completed",
                report.totals().nodes_completed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
