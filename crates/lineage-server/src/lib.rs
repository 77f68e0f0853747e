//! Lineage Server - WebSocket server for genealogy queries
//!
//! This crate serves the advisor graph over JSON-RPC 2.0 on WebSocket
//! connections.
//!
//! The server supports:
//! - Multiple concurrent connections
//! - Search, person pages, lineage trees and descendant statistics
//! - Institution listing
//! - Correction submissions appended to a log
//! - Rebuilding the graph from the dataset and swapping it in while
//!   queries keep running against the previous snapshot

use lineage_graph::LineageGraph;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared, swappable graph snapshot.
///
/// Readers hold the lock only to clone the `Arc`; queries then run on an
/// immutable snapshot. `replace` publishes a fully built graph in one step.
/// The version lives under the same lock as the graph it numbers.
#[derive(Debug)]
pub struct GraphHandle {
    current: RwLock<(Arc<LineageGraph>, u64)>,
}

impl GraphHandle {
    pub fn new(graph: LineageGraph) -> Self {
        Self {
            current: RwLock::new((Arc::new(graph), 1)),
        }
    }

    /// The snapshot currently being served.
    pub async fn snapshot(&self) -> Arc<LineageGraph> {
        self.current.read().await.0.clone()
    }

    /// The current snapshot together with its version.
    pub async fn versioned(&self) -> (Arc<LineageGraph>, u64) {
        let current = self.current.read().await;
        (current.0.clone(), current.1)
    }

    /// Publishes a new graph and returns its version.
    pub async fn replace(&self, graph: LineageGraph) -> u64 {
        let graph = Arc::new(graph);
        let mut current = self.current.write().await;
        let version = current.1 + 1;
        *current = (graph, version);
        version
    }

    /// Version of the current snapshot; starts at 1.
    pub async fn version(&self) -> u64 {
        self.current.read().await.1
    }
}

/// Shared graph handle across connections.
pub type SharedGraph = Arc<GraphHandle>;

mod handlers;
mod protocol;
mod server;

pub use protocol::{
    InstitutionListParams, LineageParams, PersonParams, Request, Response, RpcError, SearchParams, INTERNAL_ERROR,
    INVALID_PARAMS, METHOD_NOT_FOUND, NOT_FOUND, PARSE_ERROR,
};
pub use server::{AppState, LineageServer, ServerConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::DissertationRecord;
    use lineage_graph::GraphBuilder;

    fn graph_with(author: &str) -> LineageGraph {
        let mut builder = GraphBuilder::new();
        builder.add_records(vec![DissertationRecord::new("d1", "p1", author)]);
        builder.build()
    }

    #[tokio::test]
    async fn test_replace_swaps_snapshot() {
        let handle = GraphHandle::new(graph_with("Ada"));
        assert_eq!(handle.version().await, 1);

        let before = handle.snapshot().await;
        let version = handle.replace(graph_with("Bea")).await;

        assert_eq!(version, 2);
        assert_eq!(handle.version().await, 2);
        // A snapshot taken earlier keeps answering from the old graph
        assert_eq!(before.get_person("p1").unwrap().name, "Ada");
        assert_eq!(handle.snapshot().await.get_person("p1").unwrap().name, "Bea");
    }

    #[tokio::test]
    async fn test_versioned_pairs_graph_with_its_version() {
        let handle = Arc::new(GraphHandle::new(graph_with("Ada")));

        let writer = {
            let handle = handle.clone();
            tokio::spawn(async move {
                for name in ["Bea", "Cy", "Dee"] {
                    handle.replace(graph_with(name)).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..50 {
            let (graph, version) = handle.versioned().await;
            let expected = ["Ada", "Bea", "Cy", "Dee"][version as usize - 1];
            assert_eq!(graph.get_person("p1").unwrap().name, expected);
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
        let (graph, version) = handle.versioned().await;
        assert_eq!(version, 4);
        assert_eq!(graph.get_person("p1").unwrap().name, "Dee");
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_whole_graphs() {
        let handle = Arc::new(GraphHandle::new(graph_with("Ada")));

        let mut readers = Vec::new();
        for _ in 0..8 {
            let handle = handle.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let graph = handle.snapshot().await;
                    let name = graph.get_person("p1").unwrap().name.clone();
                    assert!(name == "Ada" || name == "Bea");
                    tokio::task::yield_now().await;
                }
            }));
        }

        handle.replace(graph_with("Bea")).await;
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(handle.snapshot().await.get_person("p1").unwrap().name, "Bea");
    }
}
