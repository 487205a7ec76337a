use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use model::{itinerary::Itinerary, risk::RiskAssessment};
use routing::RouteQuery;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    common::{RouteErrorResponse, RouteResult},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/search", get(search))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    from: Option<String>,
    to: Option<String>,
    date: Option<String>,
    passengers: Option<i64>,
}

/// The primary itinerary first, alternatives after it. An empty list means
/// the request was fine but nothing connects the two cities.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    itineraries: Vec<Itinerary>,
    risk: Option<RiskAssessment>,
}

async fn search(
    State(state): State<WebState>,
    Query(params): Query<SearchParams>,
) -> RouteResult<SearchResponse> {
    let query = validate(params)?;

    let plan = state
        .routing
        .search(&query)
        .await
        .map_err(RouteErrorResponse::from)?;

    let response = match plan {
        Some(plan) => {
            let mut itineraries = vec![plan.primary];
            itineraries.extend(plan.alternatives);
            SearchResponse {
                itineraries,
                risk: Some(plan.risk),
            }
        }
        None => SearchResponse {
            itineraries: Vec::new(),
            risk: None,
        },
    };
    Ok(Json(response))
}

fn validate(params: SearchParams) -> Result<RouteQuery, RouteErrorResponse> {
    let mut errors = Vec::new();

    let from = params.from.unwrap_or_default().trim().to_owned();
    if from.is_empty() {
        errors.push("from: origin city is required".to_owned());
    }
    let to = params.to.unwrap_or_default().trim().to_owned();
    if to.is_empty() {
        errors.push("to: destination city is required".to_owned());
    }

    let date = match params.date.as_deref() {
        None | Some("") => None,
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(format!("date: {raw:?} is not YYYY-MM-DD"));
                None
            }
        },
    };

    let passengers = match params.passengers {
        None => 1,
        Some(count) if count >= 1 => count as u32,
        Some(count) => {
            errors.push(format!(
                "passengers: {count} is not a positive integer"
            ));
            0
        }
    };

    if !errors.is_empty() {
        return Err(RouteErrorResponse::bad_request(errors));
    }
    Ok(RouteQuery {
        from,
        to,
        date,
        passengers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_and_validation_accumulates() {
        let query = validate(SearchParams {
            from: Some("Якутск".to_owned()),
            to: Some("Тикси".to_owned()),
            date: Some("2026-03-10".to_owned()),
            passengers: None,
        })
        .unwrap();
        assert_eq!(query.passengers, 1);
        assert_eq!(query.date, NaiveDate::from_ymd_opt(2026, 3, 10));

        let error = validate(SearchParams {
            from: None,
            to: Some("  ".to_owned()),
            date: Some("10.03.2026".to_owned()),
            passengers: Some(0),
        })
        .unwrap_err();
        assert_eq!(error.errors.len(), 4);
    }
}
