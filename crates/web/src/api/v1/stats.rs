use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use model::{dataset::DatasetSummary, graph::GraphMetadata};

use crate::{
    common::{RouteErrorResponse, RouteResult},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/graph", get(graph_stats))
        .route("/dataset", get(dataset_stats))
        .with_state(state)
}

async fn graph_stats(
    State(state): State<WebState>,
) -> RouteResult<GraphMetadata> {
    state
        .store
        .stats()
        .map(Json)
        .ok_or_else(|| RouteErrorResponse::not_found("no graph published yet"))
}

async fn dataset_stats(
    State(state): State<WebState>,
) -> RouteResult<DatasetSummary> {
    let active_version = state.repos.datasets.active_version().await?;
    let dataset = match &active_version {
        Some(version) => state.repos.datasets.get(version).await?,
        None => state.repos.datasets.get_latest().await?,
    };
    let Some(dataset) = dataset else {
        return Err(RouteErrorResponse::not_found("no dataset ingested yet"));
    };
    let is_active = active_version.as_deref() == Some(dataset.version.as_str());
    Ok(Json(DatasetSummary::of(&dataset, is_active)))
}
