use crate::graph::LineageGraph;
use sled::Db;
use std::path::Path;
use thiserror::Error;

const GRAPH_KEY: &str = "lineage_graph";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Persists a built graph so it can be reloaded without the dataset.
pub struct SnapshotStore {
    db: Db,
}

impl SnapshotStore {
    /// Opens or creates a snapshot store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Saves the entire graph, indexes included, under a fixed key.
    pub fn save_graph(&self, graph: &LineageGraph) -> Result<(), StoreError> {
        let bytes = bincode::serialize(graph)?;
        self.db.insert(GRAPH_KEY, bytes)?;
        self.db.flush()?;
        Ok(())
    }

    /// Loads the graph from the store.
    pub fn load_graph(&self) -> Result<Option<LineageGraph>, StoreError> {
        if let Some(bytes) = self.db.get(GRAPH_KEY)? {
            let graph: LineageGraph = bincode::deserialize(&bytes)?;
            Ok(Some(graph))
        } else {
            Ok(None)
        }
    }

    /// True if a graph has been saved.
    pub fn has_graph(&self) -> Result<bool, StoreError> {
        Ok(self.db.contains_key(GRAPH_KEY)?)
    }

    /// Clears the stored graph.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.db.remove(GRAPH_KEY)?;
        self.db.flush()?;
        Ok(())
    }
}
