//! Crawler module for expanding the friend graph
//!
//! This module contains the core crawling logic, including:
//! - The remote graph client
//! - Edge list parsing
//! - The per-worker claim/fetch/persist/complete cycle
//! - Worker pool supervision and run bookkeeping

mod coordinator;
mod fetcher;
mod parser;
mod worker;

pub use coordinator::{Coordinator, PoolReport, PoolSettings};
pub use fetcher::{
    build_http_client, FetchResult, GraphClient, RemoteEdge, SteamClient, FRIEND_LIST_PATH,
};
pub use parser::{parse_edges, parse_target_id, EdgeParseError, ParsedEdges, RejectedEdge};
pub use worker::{CrawlWorker, WorkerReport, WorkerSettings};

use crate::config::Config;
use crate::storage::{open_storage, RunStatus, Storage};
use crate::CrawlError;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation against the Steam Web API
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the config file, recorded with the run
/// * `shutdown` - Cancelled to stop the crawl early
///
/// # Returns
///
/// * `Ok(PoolReport)` - The pool stopped; the run is recorded as finished
/// * `Err(CrawlError)` - Crawl failed
///
/// # Example
///
/// ```no_run
/// use steamer::config::load_config_with_hash;
/// use steamer::crawler::crawl;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("steamer.toml"))?;
/// let report = crawl(config, &hash, CancellationToken::new()).await?;
/// println!("{} nodes completed", report.totals().nodes_completed);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    config: Config,
    config_hash: &str,
    shutdown: CancellationToken,
) -> Result<PoolReport, CrawlError> {
    let client = SteamClient::from_config(&config.api, config.proxy.as_ref())?;
    crawl_with_client(config, config_hash, Arc::new(client), shutdown).await
}

/// Runs a complete crawl operation with the given graph client
///
/// This will:
/// 1. Open the database and seed the frontier
/// 2. Record a new run
/// 3. Run the worker pool until the duration elapses or `shutdown` fires
/// 4. Record how the run ended and checkpoint the write-ahead log
pub async fn crawl_with_client<C: GraphClient + 'static>(
    config: Config,
    config_hash: &str,
    client: Arc<C>,
    shutdown: CancellationToken,
) -> Result<PoolReport, CrawlError> {
    let database_path = Path::new(&config.output.database_path);
    let mut storage = open_storage(database_path)?;

    let seed = config.crawler.seed_id;
    if storage.upsert_node(seed)? {
        tracing::info!("Seeded frontier with node {}", seed);
    } else {
        tracing::info!("Seed node {} already known, resuming crawl", seed);
    }

    let leased = storage.get_leased_nodes()?;
    if !leased.is_empty() {
        tracing::info!(
            "{} nodes are still leased from an earlier run and will be reclaimed after {}s",
            leased.len(),
            config.crawler.lease_timeout_secs
        );
    }

    let run_id = storage.create_run(config_hash)?;
    tracing::info!(
        "Starting crawl run {} with {} workers",
        run_id,
        config.crawler.max_workers
    );

    let coordinator = Coordinator::new(
        PoolSettings::from(&config.crawler),
        database_path,
        client,
    );
    let result = coordinator.run(shutdown.clone()).await;

    let status = match &result {
        Err(_) => RunStatus::Failed,
        // No worker exited normally
        Ok(report) if report.panicked > 0 && report.workers.is_empty() => RunStatus::Failed,
        Ok(_) if shutdown.is_cancelled() => RunStatus::Interrupted,
        Ok(_) => RunStatus::Completed,
    };
    let finished = storage.finish_run(run_id, status);

    tracing::info!("Workers have finished, performing database checkpoint");
    let checkpointed = storage.checkpoint();

    let report = result?;
    finished?;
    checkpointed?;
    let totals = report.totals();
    tracing::info!(
        "Crawl run {} {}: {} nodes completed ({} restricted, {} fetch errors), {} new edges, {} leases lost",
        run_id,
        status.to_db_string(),
        totals.nodes_completed,
        totals.restricted_nodes,
        totals.fetch_errors,
        totals.edges_persisted,
        totals.leases_lost
    );
    if report.panicked > 0 {
        tracing::warn!("{} worker tasks panicked", report.panicked);
    }

    Ok(report)
}
