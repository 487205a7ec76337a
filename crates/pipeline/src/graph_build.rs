use std::sync::Arc;

use async_trait::async_trait;
use route_graph::GraphStore;

use crate::worker::{
    Worker, WorkerContext, WorkerError, WorkerReport, WorkerState,
    GRAPH_BUILD_WORKER,
};

/// W3: builds a graph from the latest dataset and publishes it. Activation
/// of the dataset happens only after the build has passed validation and the
/// weight audit, so a failed build leaves both the previous graph and the
/// previous active dataset in place.
pub struct GraphBuildWorker {
    store: Arc<GraphStore>,
    state: WorkerState,
}

impl GraphBuildWorker {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self {
            store,
            state: WorkerState::new(),
        }
    }
}

#[async_trait]
impl Worker for GraphBuildWorker {
    fn id(&self) -> &'static str {
        GRAPH_BUILD_WORKER
    }

    fn state(&self) -> &WorkerState {
        &self.state
    }

    async fn execute(
        &self,
        context: &WorkerContext,
    ) -> Result<WorkerReport, WorkerError> {
        let Some(dataset) = context.repos.datasets.get_latest().await? else {
            return Ok(WorkerReport::skipped("no dataset to build from", None));
        };

        if self.state.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }

        let metadata = self.store.update_from_dataset(&dataset).await?;
        context.repos.datasets.set_active(&dataset.version).await?;

        log::info!(
            "published graph for dataset {}: {} nodes, {} edges",
            dataset.version,
            metadata.node_count,
            metadata.edge_count
        );
        Ok(WorkerReport::completed(
            metadata.edge_count,
            format!("graph {}", metadata.dataset_version),
            None,
        ))
    }
}
