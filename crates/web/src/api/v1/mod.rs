use axum::{extract::State, routing::get, Json, Router};
use pipeline::WorkerMetadata;
use schemars::JsonSchema;
use serde::Serialize;

use crate::WebState;

pub mod admin;
pub mod cities;
pub mod risk;
pub mod routes;
pub mod stats;

pub fn routes(state: WebState) -> Router {
    let mut router = Router::new()
        .nest("/routes", routes::routes(state.clone()))
        .nest("/risk", risk::routes(state.clone()))
        .nest("/stats", stats::routes(state.clone()))
        .nest("/cities", cities::routes(state.clone()));

    // destructive admin surface stays off in production
    if !state.config.is_production() {
        router = router.nest("/admin", admin::routes(state.clone()));
    }

    router.route(
        "/health",
        get(health).with_state(state),
    )
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    healthy: bool,
    graph_published: bool,
    workers: Vec<WorkerHealth>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct WorkerHealth {
    id: &'static str,
    #[serde(flatten)]
    metadata: WorkerMetadata,
}

async fn health(State(state): State<WebState>) -> Json<HealthResponse> {
    let graph_published = state.store.get().is_some();
    let workers = state
        .orchestrator
        .worker_metadata()
        .into_iter()
        .map(|(id, metadata)| WorkerHealth { id, metadata })
        .collect();
    Json(HealthResponse {
        healthy: graph_published,
        graph_published,
        workers,
    })
}
