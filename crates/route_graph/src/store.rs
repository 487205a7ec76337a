use std::sync::{Arc, Mutex};

use chrono::Utc;
use model::{
    dataset::Dataset,
    graph::{Graph, GraphMetadata},
};
use storage::GraphRepository;

use crate::builder::{build_graph, BuildError};

struct ActiveGraph {
    graph: Arc<Graph>,
    metadata: GraphMetadata,
}

/// Owner of the single published graph.
///
/// Readers take an `Arc` clone and never hold the lock while routing; a
/// publish swaps the reference under the mutex, so a reader sees either the
/// graph published before it started or a newer one, never a half-built one.
/// Old graphs stay alive until their last reader drops them.
pub struct GraphStore {
    repository: Arc<dyn GraphRepository>,
    active: Mutex<Option<ActiveGraph>>,
}

impl GraphStore {
    pub fn new(repository: Arc<dyn GraphRepository>) -> Self {
        Self {
            repository,
            active: Mutex::new(None),
        }
    }

    /// The currently published graph, without copying.
    pub fn get(&self) -> Option<Arc<Graph>> {
        let active = self.active.lock().expect("graph store lock poisoned");
        active.as_ref().map(|active| active.graph.clone())
    }

    /// Metadata of the published graph.
    pub fn stats(&self) -> Option<GraphMetadata> {
        let active = self.active.lock().expect("graph store lock poisoned");
        active.as_ref().map(|active| active.metadata.clone())
    }

    /// Persists the graph and its metadata, then atomically replaces the
    /// active reference.
    pub async fn publish(
        &self,
        graph: Graph,
        dataset_version: &str,
    ) -> storage::Result<GraphMetadata> {
        let metadata = GraphMetadata {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            built_at: Utc::now(),
            dataset_version: dataset_version.to_owned(),
            is_active: true,
        };

        self.repository.save_graph(dataset_version, &graph).await?;
        self.repository
            .set_active_graph_metadata(&metadata)
            .await?;

        let mut active = self.active.lock().expect("graph store lock poisoned");
        *active = Some(ActiveGraph {
            graph: Arc::new(graph),
            metadata: metadata.clone(),
        });
        Ok(metadata)
    }

    /// Rebuilds from a dataset and publishes the result. On build failure
    /// the previously published graph remains active.
    pub async fn update_from_dataset(
        &self,
        dataset: &Dataset,
    ) -> Result<GraphMetadata, BuildError> {
        let graph = build_graph(dataset)?;
        self.publish(graph, &dataset.version)
            .await
            .map_err(BuildError::Storage)
    }
}
