//! Configuration module for Steamer
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use steamer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("steamer.toml")).unwrap();
//! println!("Crawl starts from node {}", config.crawler.seed_id);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, Config, CrawlerConfig, OutputConfig, ProxyConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, resolve_api_key, API_KEY_ENV,
};
pub use validation::validate;
