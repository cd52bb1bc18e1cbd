//! Node status definitions for the crawl work queue
//!
//! A node moves `Pending -> Processing -> Processed`. The only way back from
//! `Processing` to `Pending` is stale lease reclamation.

use std::fmt;

/// Represents the queue state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Node is in the frontier, waiting to be claimed
    Pending,

    /// Node is leased by a worker
    Processing,

    /// Node's edge list has been fetched and recorded
    Processed,
}

impl NodeStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [NodeStatus; 3] = [Self::Pending, Self::Processing, Self::Processed];

    /// Returns true if a worker currently holds a lease on a node in this status
    pub fn is_leased(&self) -> bool {
        matches!(self, Self::Processing)
    }

    /// Returns true if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Processed => "processed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "processed" => Some(Self::Processed),
            _ => None,
        }
    }

    /// Returns true if moving from `self` to `to` is a legal queue transition
    pub fn can_transition_to(&self, to: NodeStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Processed)
                | (Self::Processing, Self::Pending)
        )
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_string_roundtrip() {
        for status in NodeStatus::ALL {
            assert_eq!(NodeStatus::from_db_string(status.to_db_string()), Some(status));
        }
    }

    #[test]
    fn test_unknown_db_string() {
        assert_eq!(NodeStatus::from_db_string("fetching"), None);
        assert_eq!(NodeStatus::from_db_string(""), None);
    }

    #[test]
    fn test_only_processing_is_leased() {
        assert!(!NodeStatus::Pending.is_leased());
        assert!(NodeStatus::Processing.is_leased());
        assert!(!NodeStatus::Processed.is_leased());
    }

    #[test]
    fn test_transitions() {
        assert!(NodeStatus::Pending.can_transition_to(NodeStatus::Processing));
        assert!(NodeStatus::Processing.can_transition_to(NodeStatus::Processed));
        // stale lease reclamation
        assert!(NodeStatus::Processing.can_transition_to(NodeStatus::Pending));

        assert!(!NodeStatus::Pending.can_transition_to(NodeStatus::Processed));
        assert!(!NodeStatus::Processed.can_transition_to(NodeStatus::Pending));
        assert!(!NodeStatus::Processed.can_transition_to(NodeStatus::Processing));
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeStatus::Processing.to_string(), "processing");
    }
}
