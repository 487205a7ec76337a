use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use pipeline::PipelineReport;

use crate::{
    common::{RouteErrorResponse, RouteResult},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/reinit", post(reinit))
        .with_state(state)
}

/// Drops every stored record and runs the pipeline from scratch. The router
/// only mounts this outside production, and the orchestrator refuses it
/// there as well.
async fn reinit(State(state): State<WebState>) -> RouteResult<PipelineReport> {
    state
        .orchestrator
        .reinit(&state.config.environment)
        .await
        .map(Json)
        .map_err(RouteErrorResponse::from)
}
