//! Repository interfaces behind which the relational store and the cache
//! store live. Drivers are pluggable; the bundled implementations keep
//! everything in process memory and back the tests and local runs.

use std::{error, fmt, result, sync::Arc};

use async_trait::async_trait;
use model::{
    dataset::Dataset,
    flight::Flight,
    graph::{Graph, GraphMetadata},
    route::Route,
    stop::Stop,
};

pub mod cache;
pub mod memory;

pub use cache::{CacheRepository, MemoryCache};

/// Cache key of the reference city listing.
pub const CITIES_CACHE_KEY: &str = "cities:list";
/// TTL of the cities listing, seconds.
pub const CITIES_CACHE_TTL: u64 = 3600;
/// TTL of upstream snapshot metadata, seconds.
pub const UPSTREAM_METADATA_TTL: u64 = 86400;
/// TTL of per-entity fetches, seconds.
pub const ENTITY_CACHE_TTL: u64 = 3600;

/// Key under which the serialized graph payload of a version is stored.
pub fn graph_payload_key(version: &str) -> String {
    format!("graph:{version}:payload")
}

/// Key naming the currently active graph version.
pub const GRAPH_CURRENT_VERSION_KEY: &str = "graph:current:version";

#[derive(Debug)]
pub enum StorageError {
    NotFound,
    Conflict(String),
    Serialization(serde_json::Error),
    Other(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound => write!(f, "entity not found"),
            StorageError::Conflict(what) => write!(f, "conflict: {what}"),
            StorageError::Serialization(why) => {
                write!(f, "serialization failed: {why}")
            }
            StorageError::Other(why) => write!(f, "storage error: {why}"),
        }
    }
}

impl error::Error for StorageError {}

impl From<serde_json::Error> for StorageError {
    fn from(why: serde_json::Error) -> Self {
        StorageError::Serialization(why)
    }
}

pub type Result<T> = result::Result<T, StorageError>;

/// Which stops or routes a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityFilter {
    All,
    RealOnly,
    VirtualOnly,
}

impl EntityFilter {
    pub fn matches(&self, is_virtual: bool) -> bool {
        match self {
            EntityFilter::All => true,
            EntityFilter::RealOnly => !is_virtual,
            EntityFilter::VirtualOnly => is_virtual,
        }
    }
}

#[async_trait]
pub trait StopRepository: Send + Sync {
    async fn save_bulk(&self, stops: &[Stop]) -> Result<usize>;
    async fn list(&self, filter: EntityFilter) -> Result<Vec<Stop>>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn save_bulk(&self, routes: &[Route]) -> Result<usize>;
    async fn list(&self, filter: EntityFilter) -> Result<Vec<Route>>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn save_bulk(&self, flights: &[Flight]) -> Result<usize>;
    async fn list(&self) -> Result<Vec<Flight>>;
    async fn count(&self, include_virtual: bool) -> Result<usize>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait DatasetRepository: Send + Sync {
    /// Most recently created dataset, active or not.
    async fn get_latest(&self) -> Result<Option<Dataset>>;
    async fn get(&self, version: &str) -> Result<Option<Dataset>>;
    async fn save(&self, dataset: &Dataset) -> Result<()>;
    async fn delete(&self, version: &str) -> Result<()>;
    /// Marks one version active and retires every other.
    async fn set_active(&self, version: &str) -> Result<()>;
    async fn active_version(&self) -> Result<Option<String>>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait GraphRepository: Send + Sync {
    async fn save_graph(&self, version: &str, payload: &Graph) -> Result<()>;
    async fn get_graph(&self, version: &str) -> Result<Option<Graph>>;
    async fn delete_graph(&self, version: &str) -> Result<()>;
    async fn set_active_graph_metadata(
        &self,
        metadata: &GraphMetadata,
    ) -> Result<()>;
    async fn get_graph_metadata(&self) -> Result<Option<GraphMetadata>>;
    /// Version named by `graph:current:version`, if any.
    async fn get_graph_version(&self) -> Result<Option<String>>;
}

/// Handle bundling every repository the engine touches. Cloning is cheap;
/// the workers and the web layer all share one bundle.
#[derive(Clone)]
pub struct Repositories {
    pub stops: Arc<dyn StopRepository>,
    pub routes: Arc<dyn RouteRepository>,
    pub flights: Arc<dyn FlightRepository>,
    pub datasets: Arc<dyn DatasetRepository>,
    pub graphs: Arc<dyn GraphRepository>,
    pub cache: Arc<dyn CacheRepository>,
}

impl Repositories {
    /// Bundle backed entirely by process memory.
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            stops: store.clone(),
            routes: store.clone(),
            flights: store.clone(),
            datasets: store.clone(),
            graphs: store,
            cache: Arc::new(MemoryCache::new()),
        }
    }

    /// Drops every persisted record, graph payload, and cache entry. Only
    /// the admin reinit flow calls this.
    pub async fn clear_all(&self) -> Result<()> {
        self.stops.delete_all().await?;
        self.routes.delete_all().await?;
        self.flights.delete_all().await?;
        self.datasets.delete_all().await?;
        if let Some(version) = self.graphs.get_graph_version().await? {
            self.graphs.delete_graph(&version).await?;
        }
        self.cache.delete_by_pattern("*").await?;
        Ok(())
    }
}
