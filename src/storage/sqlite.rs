//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Each worker opens its own `SqliteStorage` on the same database file;
//! SQLite's write lock is the only synchronization between them.

use crate::state::NodeStatus;
use crate::storage::clock::{Clock, SystemClock};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    EdgeInsertSummary, EdgeRecord, NewEdge, NodeRecord, RunRecord, RunStatus,
};
use crate::{CrawlError, NodeId};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// How long a connection waits on another connection's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const NODE_COLUMNS: &str =
    "id, status, last_updated, edge_count, restricted, lease_holder, lease_time";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    clock: Arc<dyn Clock>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance using the system clock
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlError> {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    /// Opens the database at `path`, reading lease times from `clock`
    pub fn with_clock(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, CrawlError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn, clock })
    }

    /// Creates an in-memory database (for testing)
    ///
    /// An in-memory database is private to its connection, so it cannot be
    /// shared between workers.
    pub fn new_in_memory() -> Result<Self, CrawlError> {
        Self::new_in_memory_with_clock(Arc::new(SystemClock))
    }

    /// Creates an in-memory database that reads time from `clock`
    pub fn new_in_memory_with_clock(clock: Arc<dyn Clock>) -> Result<Self, CrawlError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn, clock })
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }
}

fn millis_to_datetime(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(DateTime::<Utc>::from_timestamp_millis)
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<NodeRecord> {
    let status: String = row.get(1)?;
    let status = NodeStatus::from_db_string(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("unknown node status '{}'", status).into(),
        )
    })?;

    Ok(NodeRecord {
        id: row.get(0)?,
        status,
        last_updated: millis_to_datetime(row.get(2)?),
        edge_count: row.get(3)?,
        restricted: row.get(4)?,
        lease_holder: row.get(5)?,
        lease_time: millis_to_datetime(row.get(6)?),
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let status: String = row.get(4)?;
    let status = RunStatus::from_db_string(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown run status '{}'", status).into(),
        )
    })?;

    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status,
    })
}

impl Storage for SqliteStorage {
    // ===== Work Queue =====

    fn upsert_node(&mut self, id: NodeId) -> StorageResult<bool> {
        let inserted = self
            .conn
            .execute("INSERT OR IGNORE INTO nodes (id) VALUES (?1)", params![id])?;
        Ok(inserted > 0)
    }

    fn claim_node(
        &mut self,
        worker_id: &str,
        lease_timeout: Duration,
    ) -> StorageResult<Option<NodeRecord>> {
        let now = self.now_millis();
        let timeout = i64::try_from(lease_timeout.as_millis()).unwrap_or(i64::MAX);
        let stale_before = now.saturating_sub(timeout);

        // IMMEDIATE takes the write lock up front so reclaim and claim see the
        // same snapshot and no other connection can interleave.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let reclaimed = tx.execute(
            "UPDATE nodes SET status = ?1, lease_holder = NULL, lease_time = NULL
             WHERE status = ?2 AND lease_time <= ?3",
            params![
                NodeStatus::Pending.to_db_string(),
                NodeStatus::Processing.to_db_string(),
                stale_before
            ],
        )?;

        let claimed = tx
            .query_row(
                &format!(
                    "UPDATE nodes SET status = ?1, lease_holder = ?2, lease_time = ?3
                     WHERE id = (SELECT id FROM nodes WHERE status = ?4 ORDER BY id LIMIT 1)
                     RETURNING {}",
                    NODE_COLUMNS
                ),
                params![
                    NodeStatus::Processing.to_db_string(),
                    worker_id,
                    now,
                    NodeStatus::Pending.to_db_string()
                ],
                row_to_node,
            )
            .optional()?;

        tx.commit()?;

        if reclaimed > 0 {
            tracing::info!("[{}] Reclaimed {} stale leases", worker_id, reclaimed);
        }

        Ok(claimed)
    }

    fn complete_node(
        &mut self,
        node: &NodeRecord,
        edge_count: u32,
        restricted: bool,
    ) -> StorageResult<()> {
        let precondition_failed = || StorageError::PreconditionFailed {
            node_id: node.id,
            lease_holder: node.lease_holder.clone().unwrap_or_default(),
        };

        let (Some(lease_holder), Some(lease_time)) = (node.lease_holder.as_deref(), node.lease_time)
        else {
            return Err(precondition_failed());
        };

        let now = self.now_millis();
        let updated = self.conn.execute(
            "UPDATE nodes SET status = ?1, lease_holder = NULL, lease_time = NULL,
             last_updated = ?2, edge_count = ?3, restricted = ?4
             WHERE id = ?5 AND status = ?6 AND lease_holder = ?7 AND lease_time = ?8",
            params![
                NodeStatus::Processed.to_db_string(),
                now,
                edge_count,
                restricted,
                node.id,
                NodeStatus::Processing.to_db_string(),
                lease_holder,
                lease_time.timestamp_millis()
            ],
        )?;

        if updated == 0 {
            return Err(precondition_failed());
        }

        Ok(())
    }

    fn add_edges(
        &mut self,
        source_id: NodeId,
        edges: &[NewEdge],
    ) -> StorageResult<EdgeInsertSummary> {
        let mut summary = EdgeInsertSummary::default();
        if edges.is_empty() {
            return Ok(summary);
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut insert_node = tx.prepare_cached("INSERT OR IGNORE INTO nodes (id) VALUES (?1)")?;
            let mut insert_edge = tx.prepare_cached(
                "INSERT OR IGNORE INTO edges (source_id, target_id, established_at)
                 VALUES (?1, ?2, ?3)",
            )?;

            for edge in edges {
                // The target row must exist before the edge references it.
                summary.new_nodes += insert_node.execute(params![edge.target_id])?;
                summary.new_edges += insert_edge.execute(params![
                    source_id,
                    edge.target_id,
                    edge.established_at.timestamp_millis()
                ])?;
            }
        }
        tx.commit()?;

        Ok(summary)
    }

    // ===== Lookups =====

    fn get_node(&self, id: NodeId) -> StorageResult<Option<NodeRecord>> {
        let node = self
            .conn
            .query_row(
                &format!("SELECT {} FROM nodes WHERE id = ?1", NODE_COLUMNS),
                params![id],
                row_to_node,
            )
            .optional()?;
        Ok(node)
    }

    fn get_outgoing_edges(&self, source_id: NodeId) -> StorageResult<Vec<EdgeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_id, target_id, established_at FROM edges
             WHERE source_id = ?1 ORDER BY target_id",
        )?;

        let edges = stmt
            .query_map(params![source_id], |row| {
                Ok(EdgeRecord {
                    source_id: row.get(0)?,
                    target_id: row.get(1)?,
                    established_at: millis_to_datetime(row.get(2)?).unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(edges)
    }

    fn get_leased_nodes(&self) -> StorageResult<Vec<NodeRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM nodes WHERE status = ?1 ORDER BY lease_time",
            NODE_COLUMNS
        ))?;

        let nodes = stmt
            .query_map(params![NodeStatus::Processing.to_db_string()], row_to_node)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(nodes)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = self.clock.now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs
                 ORDER BY id DESC LIMIT 1",
                [],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = self.clock.now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Statistics =====

    fn count_nodes_by_status(&self, status: NodeStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total_nodes(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_edges(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_restricted_nodes(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE restricted = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Maintenance =====

    fn checkpoint(&mut self) -> StorageResult<()> {
        // Returns (busy, log frames, checkpointed frames)
        let (busy, log, checkpointed): (i64, i64, i64) = self.conn.query_row(
            "PRAGMA wal_checkpoint(TRUNCATE)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        if busy != 0 {
            tracing::warn!(
                "WAL checkpoint incomplete: {} of {} frames checkpointed",
                checkpointed,
                log
            );
        }
        Ok(())
    }
}
