use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use model::{itinerary::Itinerary, risk::RiskAssessment};

use crate::{
    common::{RouteErrorResponse, RouteResult},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/assess", post(assess))
        .with_state(state)
}

async fn assess(
    State(state): State<WebState>,
    Json(itinerary): Json<Itinerary>,
) -> RouteResult<RiskAssessment> {
    if itinerary.segments.is_empty() {
        return Err(RouteErrorResponse::bad_request(vec![
            "segments: an itinerary needs at least one segment".to_owned(),
        ]));
    }
    Ok(Json(state.routing.assess(&itinerary).await))
}
