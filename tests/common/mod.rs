//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use steamer::config::{ApiConfig, Config, CrawlerConfig, OutputConfig};
use steamer::crawler::{FetchResult, GraphClient, RemoteEdge};
use steamer::{FetchError, NodeId};

/// In-memory friend graph served through the `GraphClient` interface
#[derive(Default)]
pub struct FakeGraph {
    adjacency: HashMap<NodeId, Vec<NodeId>>,
    restricted: HashSet<NodeId>,
    failing: HashSet<NodeId>,
    calls: Mutex<Vec<NodeId>>,
}

impl FakeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edges(mut self, source: NodeId, targets: &[NodeId]) -> Self {
        self.adjacency.insert(source, targets.to_vec());
        self
    }

    pub fn with_restricted(mut self, node: NodeId) -> Self {
        self.restricted.insert(node);
        self
    }

    pub fn with_failure(mut self, node: NodeId) -> Self {
        self.failing.insert(node);
        self
    }

    /// Every node id fetched so far, in call order
    pub fn calls(&self) -> Vec<NodeId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphClient for FakeGraph {
    async fn fetch_edges(&self, node_id: NodeId) -> Result<FetchResult, FetchError> {
        self.calls.lock().unwrap().push(node_id);

        if self.failing.contains(&node_id) {
            return Err(FetchError::Status {
                node_id,
                status: 503,
            });
        }
        if self.restricted.contains(&node_id) {
            return Ok(FetchResult::Restricted);
        }

        let edges = self
            .adjacency
            .get(&node_id)
            .map(|targets| targets.iter().map(|t| remote_edge(*t)).collect())
            .unwrap_or_default();
        Ok(FetchResult::Edges(edges))
    }
}

pub fn remote_edge(target: NodeId) -> RemoteEdge {
    RemoteEdge {
        target_id: target.to_string(),
        established_at: DateTime::<Utc>::from_timestamp(1_600_000_000, 0).unwrap(),
    }
}

/// A configuration pointing at `database_path` and `base_url`
pub fn test_config(database_path: &Path, base_url: &str, seed_id: NodeId) -> Config {
    Config {
        crawler: CrawlerConfig {
            seed_id,
            max_workers: 3,
            lease_timeout_secs: 300,
            run_duration_minutes: None,
            idle_backoff_ms: 20,
        },
        api: ApiConfig {
            key: Some("TESTKEY".to_string()),
            base_url: base_url.to_string(),
            request_timeout_secs: 5,
            connect_timeout_secs: 5,
            accept_invalid_certs: false,
        },
        proxy: None,
        output: OutputConfig {
            database_path: database_path.to_string_lossy().into_owned(),
        },
    }
}
