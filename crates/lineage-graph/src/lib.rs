//! Lineage Graph - Academic advisor relationships
//!
//! This crate turns dissertation records into a directed graph of people,
//! with edges from advisor to student. It provides lookups, bounded
//! lineage trees, descendant statistics and accent-insensitive search.
//!
//! # Architecture
//!
//! The graph uses petgraph internally with additional indexes for:
//! - Id-based lookups
//! - Name and institution search (exact, prefix and n-gram)
//! - Institution membership
//!
//! Built graphs can be persisted to a sled snapshot and reloaded without
//! re-reading the dataset.
//!
//! # Example
//!
//! ```no_run
//! use lineage_graph::{load_dataset, LineageDirection};
//!
//! let load = load_dataset("data/dissertations.csv").unwrap();
//! let graph = load.graph;
//!
//! let matches = graph.search_by_name("gauss");
//! let tree = graph.lineage_tree(&matches[0].id, LineageDirection::Descendants, 3);
//! ```

mod builder;
mod edge;
mod genealogy;
mod graph;
mod query;
mod search_index;
mod store;

pub use builder::{load_dataset, BuildReport, DatasetLoad, GraphBuilder};
pub use edge::{AdvisorEdge, GraphEdge};
pub use genealogy::{
    effective_depth, generations, DescendantStats, LineageDirection, LineageNode, LineageTree,
    MAX_LINEAGE_DEPTH, MAX_TREE_NODES,
};
pub use graph::{Affiliation, GraphError, GraphSummary, LineageGraph, NodeId, Relation};
pub use query::{
    AdvisorInfo, DissertationInfo, Lineage, PersonDetail, PersonInfo, PersonRef, SearchKind,
    SearchResults, StudentInfo,
};
pub use search_index::{MatchKind, SearchHit, SearchIndex};
pub use store::{SnapshotStore, StoreError};
