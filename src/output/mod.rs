//! Output module for reporting on crawl results
//!
//! This module reads the crawl database and reports node counts by status,
//! edge totals, outstanding leases and the most recent run.

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
