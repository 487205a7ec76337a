use std::{error, fmt, sync::Arc};

use chrono::{NaiveDate, Utc};
use model::{itinerary::Itinerary, risk::RiskAssessment};
use risk::RiskEngine;
use route_graph::{find_all_paths, shortest_path, GraphStore, PathResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::assemble::assemble_itinerary;

/// DFS bound used when enumerating alternative paths.
const ALTERNATIVES_MAX_DEPTH: usize = 6;
const MAX_ALTERNATIVES: usize = 2;

#[derive(Debug)]
pub enum RoutingError {
    /// No graph has been published yet; only possible before the first
    /// pipeline run completes.
    GraphUnavailable,
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::GraphUnavailable => {
                write!(f, "no graph has been published yet")
            }
        }
    }
}

impl error::Error for RoutingError {}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuery {
    pub from: String,
    pub to: String,
    pub date: Option<NaiveDate>,
    #[serde(default = "default_passengers")]
    pub passengers: u32,
}

fn default_passengers() -> u32 {
    1
}

/// The primary itinerary, its alternatives, and the risk attached to the
/// primary.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    pub primary: Itinerary,
    pub alternatives: Vec<Itinerary>,
    pub risk: RiskAssessment,
}

/// The hot path: normalize cities, locate nodes, search, assemble, score.
/// Holds the graph store and the risk engine; reads never lock the graph.
pub struct RoutingService {
    store: Arc<GraphStore>,
    risk: Arc<RiskEngine>,
}

impl RoutingService {
    pub fn new(store: Arc<GraphStore>, risk: Arc<RiskEngine>) -> Self {
        Self { store, risk }
    }

    /// An unmatched city, an unreachable destination, or an unridable path
    /// all produce `Ok(None)`: an empty result, not an error.
    pub async fn search(
        &self,
        query: &RouteQuery,
    ) -> Result<Option<RoutePlan>, RoutingError> {
        let graph = self
            .store
            .get()
            .ok_or(RoutingError::GraphUnavailable)?;

        let from_key = reference::normalize_city(&query.from);
        let to_key = reference::normalize_city(&query.to);

        let origin = graph.node_in_city(&from_key).map(|node| node.id.clone());
        let destination =
            graph.node_in_city(&to_key).map(|node| node.id.clone());
        let (Some(origin), Some(destination)) = (origin, destination) else {
            log::debug!(
                "no nodes for {:?} -> {:?} ({from_key} -> {to_key})",
                query.from,
                query.to
            );
            return Ok(None);
        };

        let Some(path) = shortest_path(&graph, &origin, &destination) else {
            return Ok(None);
        };
        if path.edges.is_empty() {
            return Ok(None);
        }

        let now = Utc::now();
        let Some(primary) = assemble_itinerary(
            &path.edges,
            &from_key,
            &to_key,
            query.date,
            query.passengers,
            now,
        ) else {
            return Ok(None);
        };

        let alternatives = find_all_paths(
            &graph,
            &origin,
            &destination,
            ALTERNATIVES_MAX_DEPTH,
        )
        .into_iter()
        .filter(|candidate| segment_ids(candidate) != segment_ids(&path))
        .filter_map(|candidate| {
            assemble_itinerary(
                &candidate.edges,
                &from_key,
                &to_key,
                query.date,
                query.passengers,
                now,
            )
        })
        .take(MAX_ALTERNATIVES)
        .collect();

        let risk = self.risk.assess(&primary).await;

        Ok(Some(RoutePlan {
            primary,
            alternatives,
            risk,
        }))
    }

    /// Scores an externally supplied itinerary; backs the risk endpoint.
    pub async fn assess(&self, itinerary: &Itinerary) -> RiskAssessment {
        self.risk.assess(itinerary).await
    }
}

fn segment_ids(path: &PathResult) -> Vec<&str> {
    path.edges
        .iter()
        .map(|edge| edge.segment.segment_id.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use model::{
        flight::{Flight, FlightStatus},
        graph::{Edge, Graph, Node, Segment},
        route::TransportKind,
    };
    use storage::Repositories;
    use utility::id::Id;

    use super::*;

    fn node(id: &str, city: &str) -> Node {
        Node {
            id: Id::new(id.to_owned()),
            name: id.to_owned(),
            location: None,
            city: city.to_owned(),
        }
    }

    fn edge(from: &str, to: &str, weight: f64) -> Edge {
        let departure = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        Edge {
            from: Id::new(from.to_owned()),
            to: Id::new(to.to_owned()),
            segment: Segment {
                segment_id: format!("{from}-{to}"),
                route_id: Id::new(format!("r-{from}-{to}")),
                kind: TransportKind::Bus,
                is_virtual: false,
                distance_km: None,
                duration_estimate_min: None,
                base_price: None,
            },
            weight,
            flights: vec![Flight {
                id: Id::new(format!("f-{from}-{to}")),
                route_id: Id::new(format!("r-{from}-{to}")),
                from_stop_id: Id::new(from.to_owned()),
                to_stop_id: Id::new(to.to_owned()),
                departure,
                arrival: departure + chrono::Duration::minutes(weight as i64),
                price: 500.0,
                seats_available: 10,
                status: FlightStatus::Scheduled,
            }],
        }
    }

    async fn service_with_graph(graph: Graph) -> RoutingService {
        let repos = Repositories::in_memory();
        let store = Arc::new(GraphStore::new(repos.graphs.clone()));
        store.publish(graph, "test").await.unwrap();
        RoutingService::new(store, Arc::new(RiskEngine::with_defaults()))
    }

    fn query(from: &str, to: &str) -> RouteQuery {
        RouteQuery {
            from: from.to_owned(),
            to: to.to_owned(),
            date: NaiveDate::from_ymd_opt(2026, 3, 10),
            passengers: 1,
        }
    }

    #[tokio::test]
    async fn search_returns_a_scored_plan() {
        let mut graph = Graph::new();
        graph.add_node(node("a", "якутск"));
        graph.add_node(node("b", "покровск"));
        graph.add_edge(edge("a", "b", 60.0));

        let service = service_with_graph(graph).await;
        let plan = service
            .search(&query("Якутск", "Покровск"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(plan.primary.segments.len(), 1);
        assert!((1..=10).contains(&plan.risk.score));
        assert!(plan.alternatives.is_empty());
    }

    #[tokio::test]
    async fn city_labels_are_normalized_before_matching() {
        let mut graph = Graph::new();
        graph.add_node(node("a", "якутск"));
        graph.add_node(node("b", "покровск"));
        graph.add_edge(edge("a", "b", 60.0));

        let service = service_with_graph(graph).await;
        let plan = service
            .search(&query("г. ЯКУТСК", "город Покровск"))
            .await
            .unwrap();
        assert!(plan.is_some());
    }

    #[tokio::test]
    async fn unknown_city_is_an_empty_result_not_an_error() {
        let mut graph = Graph::new();
        graph.add_node(node("a", "якутск"));
        let service = service_with_graph(graph).await;
        assert!(service
            .search(&query("Якутск", "Эльдорадо"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn a_longer_detour_becomes_an_alternative() {
        let mut graph = Graph::new();
        graph.add_node(node("a", "якутск"));
        graph.add_node(node("b", "покровск"));
        graph.add_node(node("c", "майя"));
        graph.add_edge(edge("a", "b", 60.0));
        graph.add_edge(edge("a", "c", 45.0));
        graph.add_edge(edge("c", "b", 45.0));

        let service = service_with_graph(graph).await;
        let plan = service
            .search(&query("Якутск", "Покровск"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(plan.primary.segments.len(), 1);
        assert_eq!(plan.alternatives.len(), 1);
        assert_eq!(plan.alternatives[0].segments.len(), 2);
    }

    #[tokio::test]
    async fn no_published_graph_is_an_error() {
        let repos = Repositories::in_memory();
        let store = Arc::new(GraphStore::new(repos.graphs.clone()));
        let service =
            RoutingService::new(store, Arc::new(RiskEngine::with_defaults()));
        assert!(matches!(
            service.search(&query("Якутск", "Покровск")).await,
            Err(RoutingError::GraphUnavailable)
        ));
    }
}
