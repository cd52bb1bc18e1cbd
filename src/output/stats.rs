//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::NodeStatus;
use crate::storage::{NodeRecord, RunRecord, Storage, StorageResult};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of nodes known to the store
    pub total_nodes: u64,

    /// Count of nodes by status
    pub nodes_by_status: HashMap<NodeStatus, u64>,

    /// Total number of edges recorded
    pub total_edges: u64,

    /// Processed nodes whose edges the remote source refused to disclose
    pub restricted_nodes: u64,

    /// Nodes currently leased, oldest lease first
    pub leased_nodes: Vec<NodeRecord>,

    /// The most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    /// Number of nodes in `status`
    pub fn count(&self, status: NodeStatus) -> u64 {
        self.nodes_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CrawlStatistics> {
    let total_nodes = storage.count_total_nodes()?;
    let total_edges = storage.count_edges()?;
    let restricted_nodes = storage.count_restricted_nodes()?;

    let mut nodes_by_status = HashMap::new();
    for status in NodeStatus::ALL {
        let count = storage.count_nodes_by_status(status)?;
        if count > 0 {
            nodes_by_status.insert(status, count);
        }
    }

    let leased_nodes = storage.get_leased_nodes()?;
    let latest_run = storage.get_latest_run()?;

    Ok(CrawlStatistics {
        total_nodes,
        nodes_by_status,
        total_edges,
        restricted_nodes,
        leased_nodes,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total nodes: {}", stats.total_nodes);
    println!("  Total edges: {}", stats.total_edges);
    println!("  Restricted nodes: {}", stats.restricted_nodes);
    println!();

    println!("Nodes by Status:");
    for status in NodeStatus::ALL {
        let count = stats.count(status);
        let percentage = if stats.total_nodes > 0 {
            (count as f64 / stats.total_nodes as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.leased_nodes.is_empty() {
        println!("Active Leases ({}):", stats.leased_nodes.len());
        for node in &stats.leased_nodes {
            let holder = node.lease_holder.as_deref().unwrap_or("?");
            match node.lease_time {
                Some(since) => println!("  - {} held by {} since {}", node.id, holder, since.to_rfc3339()),
                None => println!("  - {} held by {}", node.id, holder),
            }
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  Id: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Config hash: {}", run.config_hash);
        }
        None => println!("No crawl runs recorded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewEdge, RunStatus, SqliteStorage};
    use chrono::Utc;
    use std::time::Duration;

    #[test]
    fn test_statistics_of_empty_store() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = load_statistics(&storage).unwrap();

        assert_eq!(stats.total_nodes, 0);
        assert_eq!(stats.total_edges, 0);
        assert!(stats.nodes_by_status.is_empty());
        assert!(stats.leased_nodes.is_empty());
        assert!(stats.latest_run.is_none());
        assert_eq!(stats.count(NodeStatus::Pending), 0);
    }

    #[test]
    fn test_statistics_after_some_work() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("abc123").unwrap();
        storage.upsert_node(1).unwrap();

        let seed = storage
            .claim_node("w1", Duration::from_secs(300))
            .unwrap()
            .unwrap();
        let edges: Vec<NewEdge> = [2, 3, 4]
            .into_iter()
            .map(|target_id| NewEdge {
                target_id,
                established_at: Utc::now(),
            })
            .collect();
        storage.add_edges(1, &edges).unwrap();
        storage.complete_node(&seed, 3, false).unwrap();

        // Leave node 2 leased and finish the run
        storage
            .claim_node("w2", Duration::from_secs(300))
            .unwrap()
            .unwrap();
        storage.finish_run(run_id, RunStatus::Interrupted).unwrap();

        let stats = load_statistics(&storage).unwrap();

        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.total_edges, 3);
        assert_eq!(stats.count(NodeStatus::Processed), 1);
        assert_eq!(stats.count(NodeStatus::Processing), 1);
        assert_eq!(stats.count(NodeStatus::Pending), 2);
        assert_eq!(stats.leased_nodes.len(), 1);
        assert_eq!(stats.leased_nodes[0].id, 2);

        let run = stats.latest_run.unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Interrupted);
        assert_eq!(run.config_hash, "abc123");
    }
}
