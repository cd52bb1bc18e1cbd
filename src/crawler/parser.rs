//! Edge list parser
//!
//! Converts the raw edges reported by the remote source into storable edges.
//! Targets whose identifier is not a plain decimal `i64` are set aside rather
//! than failing the whole batch.

use crate::crawler::fetcher::RemoteEdge;
use crate::storage::NewEdge;
use crate::NodeId;
use std::num::ParseIntError;
use thiserror::Error;

/// Why a target identifier was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not an integer: {0}")]
pub struct EdgeParseError(#[from] ParseIntError);

/// An edge whose target could not be turned into a node id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEdge {
    pub raw_target: String,
    pub reason: EdgeParseError,
}

/// Outcome of parsing one node's edge list
#[derive(Debug, Clone, Default)]
pub struct ParsedEdges {
    /// Edges ready to be persisted, in the order reported
    pub edges: Vec<NewEdge>,

    /// Edges dropped because their target id was malformed
    pub rejected: Vec<RejectedEdge>,
}

/// Parses a remote node identifier
///
/// The identifier must be the whole string; surrounding whitespace makes it
/// malformed.
///
/// # Example
///
/// ```
/// use steamer::crawler::parse_target_id;
///
/// assert_eq!(parse_target_id("76561197960287930").unwrap(), 76561197960287930);
/// assert!(parse_target_id(" 76561197960287930 ").is_err());
/// assert!(parse_target_id("abc").is_err());
/// ```
pub fn parse_target_id(raw: &str) -> Result<NodeId, EdgeParseError> {
    Ok(raw.parse()?)
}

/// Splits a remote edge list into storable edges and rejected ones
pub fn parse_edges(remote: &[RemoteEdge]) -> ParsedEdges {
    let mut parsed = ParsedEdges::default();

    for edge in remote {
        match parse_target_id(&edge.target_id) {
            Ok(target_id) => parsed.edges.push(NewEdge {
                target_id,
                established_at: edge.established_at,
            }),
            Err(reason) => parsed.rejected.push(RejectedEdge {
                raw_target: edge.target_id.clone(),
                reason,
            }),
        }
    }

    parsed
}
