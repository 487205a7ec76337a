use std::collections::HashMap;

use async_trait::async_trait;
use model::{
    dataset::Dataset,
    flight::Flight,
    graph::{Graph, GraphMetadata},
    route::Route,
    stop::Stop,
};
use tokio::sync::RwLock;

use crate::{
    graph_payload_key, DatasetRepository, EntityFilter, FlightRepository,
    GraphRepository, Result, RouteRepository, StopRepository, StorageError,
    GRAPH_CURRENT_VERSION_KEY,
};

#[derive(Default)]
struct MemoryState {
    stops: Vec<Stop>,
    routes: Vec<Route>,
    flights: Vec<Flight>,
    datasets: HashMap<String, Dataset>,
    active_dataset: Option<String>,
    // graph payloads and the current-version pointer live in one key-value
    // namespace, mirroring the persisted layout
    graph_payloads: HashMap<String, String>,
    graph_metadata: Option<GraphMetadata>,
}

/// Relational-store stand-in holding everything in one guarded state. A
/// driver-backed implementation would substitute per-table storage behind the
/// same traits.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn upsert_by_id<T: Clone>(
    existing: &mut Vec<T>,
    incoming: &[T],
    key: impl Fn(&T) -> String,
) -> usize {
    let mut index_of: HashMap<String, usize> = existing
        .iter()
        .enumerate()
        .map(|(index, record)| (key(record), index))
        .collect();
    for record in incoming {
        match index_of.get(&key(record)) {
            Some(&index) => existing[index] = record.clone(),
            None => {
                index_of.insert(key(record), existing.len());
                existing.push(record.clone());
            }
        }
    }
    incoming.len()
}

#[async_trait]
impl StopRepository for MemoryStore {
    async fn save_bulk(&self, stops: &[Stop]) -> Result<usize> {
        let mut state = self.state.write().await;
        Ok(upsert_by_id(&mut state.stops, stops, |stop| stop.id.raw()))
    }

    async fn list(&self, filter: EntityFilter) -> Result<Vec<Stop>> {
        let state = self.state.read().await;
        Ok(state
            .stops
            .iter()
            .filter(|stop| filter.matches(stop.is_virtual))
            .cloned()
            .collect())
    }

    async fn delete_all(&self) -> Result<()> {
        self.state.write().await.stops.clear();
        Ok(())
    }
}

#[async_trait]
impl RouteRepository for MemoryStore {
    async fn save_bulk(&self, routes: &[Route]) -> Result<usize> {
        let mut state = self.state.write().await;
        Ok(upsert_by_id(&mut state.routes, routes, |route| {
            route.id.raw()
        }))
    }

    async fn list(&self, filter: EntityFilter) -> Result<Vec<Route>> {
        let state = self.state.read().await;
        Ok(state
            .routes
            .iter()
            .filter(|route| filter.matches(route.is_virtual))
            .cloned()
            .collect())
    }

    async fn delete_all(&self) -> Result<()> {
        self.state.write().await.routes.clear();
        Ok(())
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn save_bulk(&self, flights: &[Flight]) -> Result<usize> {
        let mut state = self.state.write().await;
        Ok(upsert_by_id(&mut state.flights, flights, |flight| {
            flight.id.raw()
        }))
    }

    async fn list(&self) -> Result<Vec<Flight>> {
        Ok(self.state.read().await.flights.clone())
    }

    async fn count(&self, include_virtual: bool) -> Result<usize> {
        let state = self.state.read().await;
        if include_virtual {
            return Ok(state.flights.len());
        }
        let virtual_routes: Vec<_> = state
            .routes
            .iter()
            .filter(|route| route.is_virtual)
            .map(|route| route.id.clone())
            .collect();
        Ok(state
            .flights
            .iter()
            .filter(|flight| !virtual_routes.contains(&flight.route_id))
            .count())
    }

    async fn delete_all(&self) -> Result<()> {
        self.state.write().await.flights.clear();
        Ok(())
    }
}

#[async_trait]
impl DatasetRepository for MemoryStore {
    async fn get_latest(&self) -> Result<Option<Dataset>> {
        let state = self.state.read().await;
        Ok(state
            .datasets
            .values()
            .max_by_key(|dataset| dataset.created_at)
            .cloned())
    }

    async fn get(&self, version: &str) -> Result<Option<Dataset>> {
        Ok(self.state.read().await.datasets.get(version).cloned())
    }

    async fn save(&self, dataset: &Dataset) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .datasets
            .insert(dataset.version.clone(), dataset.clone());
        Ok(())
    }

    async fn delete(&self, version: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.datasets.remove(version);
        if state.active_dataset.as_deref() == Some(version) {
            state.active_dataset = None;
        }
        Ok(())
    }

    async fn set_active(&self, version: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.datasets.contains_key(version) {
            return Err(StorageError::NotFound);
        }
        state.active_dataset = Some(version.to_owned());
        Ok(())
    }

    async fn active_version(&self) -> Result<Option<String>> {
        Ok(self.state.read().await.active_dataset.clone())
    }

    async fn delete_all(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.datasets.clear();
        state.active_dataset = None;
        Ok(())
    }
}

#[async_trait]
impl GraphRepository for MemoryStore {
    async fn save_graph(&self, version: &str, payload: &Graph) -> Result<()> {
        let serialized = serde_json::to_string(payload)?;
        let mut state = self.state.write().await;
        state
            .graph_payloads
            .insert(graph_payload_key(version), serialized);
        state.graph_payloads.insert(
            GRAPH_CURRENT_VERSION_KEY.to_owned(),
            version.to_owned(),
        );
        Ok(())
    }

    async fn get_graph(&self, version: &str) -> Result<Option<Graph>> {
        let state = self.state.read().await;
        state
            .graph_payloads
            .get(&graph_payload_key(version))
            .map(|payload| serde_json::from_str(payload))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn delete_graph(&self, version: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.graph_payloads.remove(&graph_payload_key(version));
        let was_current = state
            .graph_payloads
            .get(GRAPH_CURRENT_VERSION_KEY)
            .map(|current| current == version)
            .unwrap_or(false);
        if was_current {
            state.graph_payloads.remove(GRAPH_CURRENT_VERSION_KEY);
            state.graph_metadata = None;
        }
        Ok(())
    }

    async fn set_active_graph_metadata(
        &self,
        metadata: &GraphMetadata,
    ) -> Result<()> {
        self.state.write().await.graph_metadata = Some(metadata.clone());
        Ok(())
    }

    async fn get_graph_metadata(&self) -> Result<Option<GraphMetadata>> {
        Ok(self.state.read().await.graph_metadata.clone())
    }

    async fn get_graph_version(&self) -> Result<Option<String>> {
        Ok(self
            .state
            .read()
            .await
            .graph_payloads
            .get(GRAPH_CURRENT_VERSION_KEY)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use model::dataset::SourceMode;
    use model::stop::StopKind;
    use utility::id::Id;

    use super::*;

    fn stop(id: &str, is_virtual: bool) -> Stop {
        Stop {
            id: Id::new(id.to_owned()),
            name: format!("stop {id}"),
            location: None,
            city: "якутск".to_owned(),
            kind: StopKind::Generic,
            is_virtual,
        }
    }

    fn dataset(version: &str) -> Dataset {
        Dataset {
            version: version.to_owned(),
            hash: format!("hash-{version}"),
            source_mode: SourceMode::Mock,
            quality_score: 50,
            created_at: Utc::now(),
            stops: Vec::new(),
            routes: Vec::new(),
            flights: Vec::new(),
        }
    }

    #[tokio::test]
    async fn bulk_save_is_an_upsert() {
        let store = MemoryStore::new();
        StopRepository::save_bulk(&store, &[stop("a", false), stop("b", true)])
            .await
            .unwrap();
        StopRepository::save_bulk(&store, &[stop("a", false)])
            .await
            .unwrap();

        let all = StopRepository::list(&store, EntityFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);
        let virtuals = StopRepository::list(&store, EntityFilter::VirtualOnly)
            .await
            .unwrap();
        assert_eq!(virtuals.len(), 1);
    }

    #[tokio::test]
    async fn latest_dataset_wins_by_creation_time() {
        let store = MemoryStore::new();
        let mut older = dataset("v1");
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        store.save(&older).await.unwrap();
        store.save(&dataset("v2")).await.unwrap();

        let latest = store.get_latest().await.unwrap().unwrap();
        assert_eq!(latest.version, "v2");
    }

    #[tokio::test]
    async fn activating_an_unknown_version_fails() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set_active("missing").await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn graph_payloads_follow_the_versioned_layout() {
        let store = MemoryStore::new();
        let graph = Graph::new();
        store.save_graph("v7", &graph).await.unwrap();

        assert_eq!(
            store.get_graph_version().await.unwrap().as_deref(),
            Some("v7")
        );
        assert!(store.get_graph("v7").await.unwrap().is_some());

        store.delete_graph("v7").await.unwrap();
        assert_eq!(store.get_graph_version().await.unwrap(), None);
    }
}
