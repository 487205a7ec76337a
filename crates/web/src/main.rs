use std::sync::Arc;

use pipeline::{
    GraphBuildWorker, IngestionWorker, Orchestrator, VirtualEntityWorker,
    WorkerContext,
};
use risk::RiskEngine;
use route_graph::GraphStore;
use routing::RoutingService;
use storage::Repositories;
use upstream::{MockProvider, ODataClient, UpstreamConfig, UpstreamProvider};
use web::{config::AppConfig, start_web_server, WebState};

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env();
    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .init();
    log::info!(
        "starting in {} mode (db pool {}..{}, cache ttl {}s)",
        config.environment,
        config.database.pool_min,
        config.database.pool_max,
        config.cache.ttl_seconds
    );

    // repositories and the graph store
    let repos = Repositories::in_memory();
    let store = Arc::new(GraphStore::new(repos.graphs.clone()));

    // upstream provider: the real endpoint when configured, the seeded mock
    // otherwise
    let upstream_config = UpstreamConfig::from_env();
    let provider: Arc<dyn UpstreamProvider> = if upstream_config
        .base_url
        .is_some()
    {
        match ODataClient::new(upstream_config) {
            Ok(client) => Arc::new(client),
            Err(why) => {
                log::error!("upstream client unusable ({why}), using mock data");
                Arc::new(MockProvider::seeded())
            }
        }
    } else {
        log::warn!("ODATA_BASE_URL is not set, using mock data");
        Arc::new(MockProvider::seeded())
    };

    // the pipeline
    let mut orchestrator = Orchestrator::new(WorkerContext {
        repos: repos.clone(),
        config: config.pipeline_config(),
    });
    orchestrator.register(Arc::new(IngestionWorker::new(provider)));
    orchestrator.register(Arc::new(VirtualEntityWorker::new()));
    orchestrator.register(Arc::new(GraphBuildWorker::new(store.clone())));
    let orchestrator = Arc::new(orchestrator);

    if let Err(why) = orchestrator.run_pipeline().await {
        log::error!("initial pipeline run failed: {why}");
    }

    // the hot path
    let routing = Arc::new(RoutingService::new(
        store.clone(),
        Arc::new(RiskEngine::with_defaults()),
    ));

    start_web_server(WebState {
        routing,
        store,
        orchestrator,
        repos,
        config,
    })
    .await
    .expect("web server failed to start");
}
