//! Steamer: a resumable friend-graph crawler
//!
//! This crate crawls a social graph breadth-first from a seed node. A pool of
//! workers coordinates solely through a SQLite database acting as a durable
//! work queue with per-node leases, so a crawl survives restarts and crashed
//! workers are recovered by lease expiry.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Externally assigned node identifier (a 64-bit account id)
pub type NodeId = i64;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors from the remote graph API
///
/// A restricted node is not an error; it is reported as
/// [`crawler::FetchResult::Restricted`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request for node {node_id} failed: {source}")]
    Http {
        node_id: NodeId,
        source: reqwest::Error,
    },

    #[error("API returned status {status} for node {node_id}")]
    Status { node_id: NodeId, status: u16 },

    #[error("Failed to decode edge list for node {node_id}: {source}")]
    Decode {
        node_id: NodeId,
        source: reqwest::Error,
    },
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::NodeStatus;
