//! State module for tracking crawl progress
//!
//! `NodeStatus` is the per-node queue state persisted in the `nodes` table.

mod node_status;

pub use node_status::NodeStatus;
