//! Crawler coordinator - worker pool supervision
//!
//! This module starts a fixed number of crawl workers against one database
//! file, stops them when the run duration elapses or shutdown is requested,
//! and waits for all of them before returning.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::GraphClient;
use crate::crawler::worker::{CrawlWorker, WorkerReport, WorkerSettings};
use crate::storage::{Clock, SqliteStorage, SystemClock};
use crate::CrawlError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Pool sizing and run limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub workers: usize,
    pub worker: WorkerSettings,
    /// Wall-clock limit for the run; `None` runs until shutdown
    pub run_duration: Option<Duration>,
}

impl From<&CrawlerConfig> for PoolSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            workers: config.max_workers as usize,
            worker: WorkerSettings {
                lease_timeout: config.lease_timeout(),
                idle_backoff: config.idle_backoff(),
            },
            run_duration: config.run_duration(),
        }
    }
}

/// What the pool did during one run
#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    /// One report per worker that exited normally
    pub workers: Vec<WorkerReport>,
    /// Worker tasks that panicked
    pub panicked: usize,
    /// True if the run ended because its duration elapsed
    pub deadline_reached: bool,
}

impl PoolReport {
    /// Sums the counters of every worker
    pub fn totals(&self) -> WorkerReport {
        let mut total = WorkerReport {
            worker_id: "total".to_string(),
            ..WorkerReport::default()
        };
        for report in &self.workers {
            total.absorb(report);
        }
        total
    }
}

/// Supervises a pool of crawl workers sharing one database file
pub struct Coordinator<C> {
    settings: PoolSettings,
    database_path: PathBuf,
    client: Arc<C>,
    clock: Arc<dyn Clock>,
}

impl<C: GraphClient + 'static> Coordinator<C> {
    pub fn new(settings: PoolSettings, database_path: impl Into<PathBuf>, client: Arc<C>) -> Self {
        Self {
            settings,
            database_path: database_path.into(),
            client,
            clock: Arc::new(SystemClock),
        }
    }

    /// Uses `clock` for every lease timestamp written by the pool
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Runs the pool until the run duration elapses or `shutdown` fires
    ///
    /// Every worker connection is opened before any worker starts, so an
    /// unusable database fails the run up front. Returns once every worker
    /// has exited.
    ///
    /// # Returns
    ///
    /// * `Ok(PoolReport)` - All workers have stopped
    /// * `Err(CrawlError)` - A worker connection could not be opened
    pub async fn run(&self, shutdown: CancellationToken) -> Result<PoolReport, CrawlError> {
        let path = self.database_path.clone();
        let clock = self.clock.clone();
        let count = self.settings.workers;
        let connections = tokio::task::spawn_blocking(move || {
            (0..count)
                .map(|_| SqliteStorage::with_clock(&path, clock.clone()))
                .collect::<Result<Vec<_>, CrawlError>>()
        })
        .await??;

        let workers: Vec<_> = connections
            .into_iter()
            .map(|storage| {
                CrawlWorker::new(
                    Uuid::new_v4().to_string(),
                    storage,
                    self.client.clone(),
                    self.settings.worker,
                )
            })
            .collect();

        // Cancelling the pool never cancels the caller's token.
        let pool_token = shutdown.child_token();

        let deadline = self.settings.run_duration.map(|duration| {
            let token = pool_token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {
                        tracing::info!("Run duration of {:?} elapsed, stopping workers", duration);
                        token.cancel();
                        true
                    }
                    _ = token.cancelled() => false,
                }
            })
        });

        let mut tasks = JoinSet::new();
        for mut worker in workers {
            let token = pool_token.clone();
            tasks.spawn(async move { worker.run(token).await });
        }
        tracing::info!("Started {} workers", self.settings.workers);

        let mut report = PoolReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(worker_report) => report.workers.push(worker_report),
                Err(e) => {
                    // Its lease, if any, expires and the node is reclaimed.
                    report.panicked += 1;
                    tracing::error!("Worker task failed: {}", e);
                }
            }
        }

        pool_token.cancel();
        if let Some(timer) = deadline {
            report.deadline_reached = timer.await.unwrap_or(false);
        }

        tracing::info!("All workers have stopped");
        Ok(report)
    }
}
