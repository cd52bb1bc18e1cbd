//! Crawl worker
//!
//! A worker repeatedly claims one node from the shared store, fetches its
//! edges from the remote source, records them, and completes the node. It
//! owns its store connection; workers never talk to each other.
//!
//! Store calls can wait on SQLite's write lock, so each one runs on tokio's
//! blocking pool with the connection moved in and handed back.

use crate::crawler::fetcher::{FetchResult, GraphClient, RemoteEdge};
use crate::crawler::parser::parse_edges;
use crate::storage::{NodeRecord, Storage, StorageError, StorageResult};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Timing parameters shared by every worker in a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Age after which another worker may take over a lease
    pub lease_timeout: Duration,

    /// Pause before the next claim when the queue is empty
    pub idle_backoff: Duration,
}

/// Where a worker is in its processing cycle
#[derive(Debug)]
enum WorkerState {
    Claiming,
    Fetching(NodeRecord),
    Persisting {
        node: NodeRecord,
        edges: Vec<RemoteEdge>,
    },
    Completing {
        node: NodeRecord,
        edge_count: u32,
        restricted: bool,
    },
    Idle,
    Terminating,
}

/// Counters accumulated by one worker over its lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: String,
    /// Nodes this worker moved to `processed`
    pub nodes_completed: u64,
    /// Fetches answered with "restricted"
    pub restricted_nodes: u64,
    /// Fetches that failed (the node is still completed)
    pub fetch_errors: u64,
    /// Edge rows this worker created
    pub edges_persisted: u64,
    /// Pending nodes this worker added to the frontier
    pub nodes_discovered: u64,
    /// Remote edges dropped for a malformed target id
    pub malformed_edges: u64,
    /// Completions rejected because the lease had moved on
    pub leases_lost: u64,
    /// Store operations that failed
    pub store_errors: u64,
}

impl WorkerReport {
    /// Adds another report's counters into this one
    pub fn absorb(&mut self, other: &WorkerReport) {
        self.nodes_completed += other.nodes_completed;
        self.restricted_nodes += other.restricted_nodes;
        self.fetch_errors += other.fetch_errors;
        self.edges_persisted += other.edges_persisted;
        self.nodes_discovered += other.nodes_discovered;
        self.malformed_edges += other.malformed_edges;
        self.leases_lost += other.leases_lost;
        self.store_errors += other.store_errors;
    }
}

/// One crawl worker bound to its own store connection
pub struct CrawlWorker<S, C> {
    id: String,
    storage: Option<S>,
    client: Arc<C>,
    settings: WorkerSettings,
    report: WorkerReport,
}

impl<S: Storage + Send + 'static, C: GraphClient> CrawlWorker<S, C> {
    pub fn new(id: impl Into<String>, storage: S, client: Arc<C>, settings: WorkerSettings) -> Self {
        let id = id.into();
        Self {
            report: WorkerReport {
                worker_id: id.clone(),
                ..WorkerReport::default()
            },
            id,
            storage: Some(storage),
            client,
            settings,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The worker's store connection, or `None` once it has been lost
    pub fn storage(&self) -> Option<&S> {
        self.storage.as_ref()
    }

    /// Runs the claim/fetch/persist/complete cycle until `shutdown` fires
    ///
    /// Cancellation is observed before each claim and during idle waits. A
    /// node already claimed is carried through to completion first.
    pub async fn run(&mut self, shutdown: CancellationToken) -> WorkerReport {
        tracing::info!("[{}] Worker started", self.id);

        let mut state = WorkerState::Claiming;
        loop {
            state = match state {
                WorkerState::Claiming => {
                    if shutdown.is_cancelled() {
                        WorkerState::Terminating
                    } else if self.storage.is_none() {
                        tracing::error!("[{}] Store connection lost, stopping", self.id);
                        WorkerState::Terminating
                    } else {
                        self.claim().await
                    }
                }
                WorkerState::Fetching(node) => self.fetch(node).await,
                WorkerState::Persisting { node, edges } => self.persist(node, edges).await,
                WorkerState::Completing {
                    node,
                    edge_count,
                    restricted,
                } => self.complete(node, edge_count, restricted).await,
                WorkerState::Idle => {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => WorkerState::Terminating,
                        _ = tokio::time::sleep(self.settings.idle_backoff) => WorkerState::Claiming,
                    }
                }
                WorkerState::Terminating => break,
            };
        }

        tracing::info!(
            "[{}] Shutting down worker after {} nodes",
            self.id,
            self.report.nodes_completed
        );
        self.report.clone()
    }

    /// Runs one store operation on the blocking pool
    ///
    /// If the blocking task panics the connection is gone and every later
    /// call fails.
    async fn on_store<T, F>(&mut self, op: F) -> StorageResult<T>
    where
        F: FnOnce(&mut S) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut storage = self
            .storage
            .take()
            .ok_or_else(|| StorageError::Database("store connection lost".to_string()))?;

        let (storage, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut storage);
            (storage, result)
        })
        .await
        .map_err(|e| StorageError::Database(format!("store task failed: {}", e)))?;

        self.storage = Some(storage);
        result
    }

    async fn claim(&mut self) -> WorkerState {
        let worker_id = self.id.clone();
        let lease_timeout = self.settings.lease_timeout;
        let claimed = self
            .on_store(move |storage| storage.claim_node(&worker_id, lease_timeout))
            .await;

        match claimed {
            Ok(Some(node)) => {
                tracing::debug!("[{}] Processing node {}", self.id, node.id);
                WorkerState::Fetching(node)
            }
            Ok(None) => {
                tracing::trace!("[{}] No pending nodes", self.id);
                WorkerState::Idle
            }
            Err(e) if e.is_transient() => {
                self.report.store_errors += 1;
                tracing::warn!("[{}] Store busy, retrying claim: {}", self.id, e);
                WorkerState::Idle
            }
            Err(e) => {
                self.report.store_errors += 1;
                tracing::error!("[{}] Error claiming node: {}", self.id, e);
                WorkerState::Idle
            }
        }
    }

    async fn fetch(&mut self, node: NodeRecord) -> WorkerState {
        match self.client.fetch_edges(node.id).await {
            Ok(FetchResult::Edges(edges)) => WorkerState::Persisting { node, edges },
            Ok(FetchResult::Restricted) => {
                tracing::debug!("[{}] Node {} is restricted", self.id, node.id);
                self.report.restricted_nodes += 1;
                WorkerState::Completing {
                    node,
                    edge_count: 0,
                    restricted: true,
                }
            }
            Err(e) => {
                // Completed anyway so one bad node cannot stall the crawl.
                tracing::warn!("[{}] Error fetching edges: {}", self.id, e);
                self.report.fetch_errors += 1;
                WorkerState::Completing {
                    node,
                    edge_count: 0,
                    restricted: false,
                }
            }
        }
    }

    async fn persist(&mut self, node: NodeRecord, edges: Vec<RemoteEdge>) -> WorkerState {
        let edge_count = u32::try_from(edges.len()).unwrap_or(u32::MAX);
        let parsed = parse_edges(&edges);

        for rejected in &parsed.rejected {
            tracing::warn!(
                "[{}] Skipping edge {} -> '{}': {}",
                self.id,
                node.id,
                rejected.raw_target,
                rejected.reason
            );
        }
        self.report.malformed_edges += parsed.rejected.len() as u64;

        let source_id = node.id;
        let new_edges = parsed.edges;
        let added = self
            .on_store(move |storage| storage.add_edges(source_id, &new_edges))
            .await;

        match added {
            Ok(summary) => {
                tracing::debug!(
                    "[{}] Node {}: {} edges, {} new nodes",
                    self.id,
                    node.id,
                    summary.new_edges,
                    summary.new_nodes
                );
                self.report.edges_persisted += summary.new_edges as u64;
                self.report.nodes_discovered += summary.new_nodes as u64;
            }
            Err(e) => {
                self.report.store_errors += 1;
                tracing::error!(
                    "[{}] Error adding edges for node {}: {}",
                    self.id,
                    node.id,
                    e
                );
            }
        }

        WorkerState::Completing {
            node,
            edge_count,
            restricted: false,
        }
    }

    async fn complete(&mut self, node: NodeRecord, edge_count: u32, restricted: bool) -> WorkerState {
        let node_id = node.id;
        let completed = self
            .on_store(move |storage| storage.complete_node(&node, edge_count, restricted))
            .await;

        match completed {
            Ok(()) => {
                self.report.nodes_completed += 1;
            }
            Err(e) if e.is_precondition_failed() => {
                tracing::debug!(
                    "[{}] Lease on node {} was taken over, discarding result",
                    self.id,
                    node_id
                );
                self.report.leases_lost += 1;
            }
            Err(e) => {
                self.report.store_errors += 1;
                tracing::error!(
                    "[{}] Error updating node {} after processing: {}",
                    self.id,
                    node_id,
                    e
                );
            }
        }

        WorkerState::Claiming
    }
}
