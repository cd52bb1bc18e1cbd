//! Storage module for persisting the crawl graph and its work queue
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Node and edge persistence
//! - The lease protocol (claim, stale-lease reclamation, guarded completion)
//! - Run tracking

mod clock;
mod schema;
mod sqlite;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::NodeStatus;
use crate::{CrawlError, NodeId};
use chrono::{DateTime, Utc};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CrawlError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CrawlError> {
    SqliteStorage::new(path)
}

/// Represents a node in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub status: NodeStatus,
    /// When the node was last completed
    pub last_updated: Option<DateTime<Utc>>,
    /// Number of edges reported at last completion
    pub edge_count: Option<u32>,
    /// True if the remote source refused to disclose the node's edges
    pub restricted: bool,
    pub lease_holder: Option<String>,
    pub lease_time: Option<DateTime<Utc>>,
}

/// An edge to persist for a given source node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEdge {
    pub target_id: NodeId,
    pub established_at: DateTime<Utc>,
}

/// Represents a directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub established_at: DateTime<Utc>,
}

/// What an `add_edges` call newly created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeInsertSummary {
    /// Target nodes that did not exist before and are now pending
    pub new_nodes: usize,
    /// Edge rows that did not exist before
    pub new_edges: usize,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Interrupted,
            RunStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }
}
