//! Edge types for the advisor graph.
//!
//! Every edge points from an advisor to a student and remembers which
//! dissertation slot produced it. A pair of people can be joined by several
//! edges (two roles, or two dissertations); traversals merge them while
//! display code keeps them apart.

use lineage_core::AdvisorRole;
use serde::{Deserialize, Serialize};

/// An advisor→student edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorEdge {
    /// The role the advisor held.
    pub role: AdvisorRole,

    /// Dissertation this supervision belongs to.
    pub dissertation_id: String,

    /// Advisor slot on that dissertation, 1-based.
    pub slot: u8,
}

impl AdvisorEdge {
    /// Creates a new edge.
    pub fn new(role: AdvisorRole, dissertation_id: impl Into<String>, slot: u8) -> Self {
        Self {
            role,
            dissertation_id: dissertation_id.into(),
            slot,
        }
    }
}

/// A flattened edge for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub advisor: String,
    pub student: String,
    pub role: AdvisorRole,
    pub dissertation_id: String,
}
