//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::NodeStatus;
use crate::storage::{EdgeInsertSummary, EdgeRecord, NewEdge, NodeRecord, RunRecord, RunStatus};
use crate::NodeId;
use rusqlite::ErrorCode;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Lease on node {node_id} is no longer held by {lease_holder}")]
    PreconditionFailed {
        node_id: NodeId,
        lease_holder: String,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true for lock contention that is worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Returns true if a completion was rejected because the lease was lost
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every mutating operation is a self-contained transaction: it either fully
/// applies or has no effect, and no lock outlives the call.
pub trait Storage {
    // ===== Work Queue =====

    /// Inserts a node in `pending` status if it does not exist yet
    ///
    /// # Returns
    ///
    /// True if the node was created, false if it already existed
    fn upsert_node(&mut self, id: NodeId) -> StorageResult<bool>;

    /// Claims one pending node for `worker_id`
    ///
    /// In a single transaction, first resets every `processing` node whose
    /// lease is at least `lease_timeout` old back to `pending`, then leases one
    /// pending node to the caller.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(node))` - The claimed node, now `processing`
    /// * `Ok(None)` - No pending node exists
    fn claim_node(
        &mut self,
        worker_id: &str,
        lease_timeout: Duration,
    ) -> StorageResult<Option<NodeRecord>>;

    /// Marks a claimed node as processed and clears its lease
    ///
    /// `node` must be the record returned by `claim_node`. If the lease it
    /// carries is no longer the node's current lease, nothing is written and
    /// `StorageError::PreconditionFailed` is returned.
    fn complete_node(
        &mut self,
        node: &NodeRecord,
        edge_count: u32,
        restricted: bool,
    ) -> StorageResult<()>;

    /// Records the outgoing edges of `source_id`
    ///
    /// Unknown targets are created as `pending`. Already-known nodes and edges
    /// are left untouched. All rows of one call commit together.
    fn add_edges(&mut self, source_id: NodeId, edges: &[NewEdge])
        -> StorageResult<EdgeInsertSummary>;

    // ===== Lookups =====

    /// Gets a node by ID
    fn get_node(&self, id: NodeId) -> StorageResult<Option<NodeRecord>>;

    /// Gets all outgoing edges of a node
    fn get_outgoing_edges(&self, source_id: NodeId) -> StorageResult<Vec<EdgeRecord>>;

    /// Gets all nodes currently leased by a worker
    fn get_leased_nodes(&self) -> StorageResult<Vec<NodeRecord>>;

    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records the final status and finish time of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts nodes in the given status
    fn count_nodes_by_status(&self, status: NodeStatus) -> StorageResult<u64>;

    /// Gets total node count
    fn count_total_nodes(&self) -> StorageResult<u64>;

    /// Counts the total number of edges
    fn count_edges(&self) -> StorageResult<u64>;

    /// Counts processed nodes whose edge list was restricted
    fn count_restricted_nodes(&self) -> StorageResult<u64>;

    // ===== Maintenance =====

    /// Flushes the write-ahead log into the main database file
    fn checkpoint(&mut self) -> StorageResult<()>;
}
