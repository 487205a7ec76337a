use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use reference::{reference_cities, ReferenceCity};
use storage::{CITIES_CACHE_KEY, CITIES_CACHE_TTL};

use crate::{common::RouteErrorResponse, WebState};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new().route("/", get(cities)).with_state(state)
}

/// Serves the unified cities reference through the cache, so the listing
/// follows the TTL and the ingestion worker's invalidation.
async fn cities(
    State(state): State<WebState>,
) -> Result<Json<serde_json::Value>, RouteErrorResponse> {
    if let Some(cached) = state.repos.cache.get(CITIES_CACHE_KEY).await? {
        if let Ok(value) = serde_json::from_str(&cached) {
            return Ok(Json(value));
        }
    }

    let cities: &[ReferenceCity] = reference_cities();
    let value = serde_json::to_value(cities)
        .map_err(|why| RouteErrorResponse::internal(why.to_string()))?;
    let serialized = value.to_string();
    state
        .repos
        .cache
        .set(CITIES_CACHE_KEY, &serialized, CITIES_CACHE_TTL)
        .await?;
    Ok(Json(value))
}
