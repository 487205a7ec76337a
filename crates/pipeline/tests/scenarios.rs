//! End-to-end runs of the full pipeline followed by routing requests against
//! the published graph.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use model::{risk::RiskBand, route::TransportKind};
use pipeline::{
    GraphBuildWorker, IngestionWorker, Orchestrator, PipelineConfig,
    VirtualEntityWorker, WorkerContext,
};
use reference::virtual_stop_id;
use risk::RiskEngine;
use route_graph::GraphStore;
use routing::{RouteQuery, RoutingService};
use storage::Repositories;
use upstream::{MockProvider, RawFlight, RawRoute, RawStop, UpstreamSnapshot};

struct Harness {
    repos: Repositories,
    store: Arc<GraphStore>,
    orchestrator: Orchestrator,
    routing: RoutingService,
}

fn harness(snapshot: UpstreamSnapshot) -> Harness {
    let repos = Repositories::in_memory();
    let store = Arc::new(GraphStore::new(repos.graphs.clone()));
    let context = WorkerContext {
        repos: repos.clone(),
        config: PipelineConfig {
            // let back-to-back runs through; the cooldown is exercised in
            // its own test
            ingest_cooldown: Duration::ZERO,
            ..PipelineConfig::default()
        },
    };
    let mut orchestrator = Orchestrator::new(context);
    orchestrator
        .register(Arc::new(IngestionWorker::new(Arc::new(MockProvider::new(
            snapshot,
        )))));
    orchestrator.register(Arc::new(VirtualEntityWorker::new()));
    orchestrator.register(Arc::new(GraphBuildWorker::new(store.clone())));

    let routing = RoutingService::new(
        store.clone(),
        Arc::new(RiskEngine::with_defaults()),
    );
    Harness {
        repos,
        store,
        orchestrator,
        routing,
    }
}

fn stop(id: &str, name: &str, city: &str) -> RawStop {
    RawStop {
        external_id: id.to_owned(),
        name: name.to_owned(),
        latitude: Some(62.0),
        longitude: Some(129.7),
        city: city.to_owned(),
        kind: None,
    }
}

fn route(id: &str, stops: &[&str], kind: &str, fare: f64) -> RawRoute {
    RawRoute {
        external_id: id.to_owned(),
        stop_external_ids: stops.iter().map(|s| s.to_string()).collect(),
        kind: Some(kind.to_owned()),
        number: None,
        operator: None,
        base_fare: Some(fare),
    }
}

fn flight(
    id: &str,
    route: &str,
    from: &str,
    to: &str,
    departure: &str,
    arrival: &str,
    price: f64,
) -> RawFlight {
    RawFlight {
        external_id: id.to_owned(),
        route_external_id: route.to_owned(),
        from_stop_external_id: from.to_owned(),
        to_stop_external_id: to.to_owned(),
        departure: departure.to_owned(),
        arrival: arrival.to_owned(),
        price: Some(price),
        seats_available: Some(30),
        status: None,
    }
}

/// Three real cities, a bus leg and a train leg, one ride each per day.
fn three_city_snapshot() -> UpstreamSnapshot {
    UpstreamSnapshot {
        stops: vec![
            stop("s-a", "Автовокзал Якутск", "Якутск"),
            stop("s-b", "Автостанция Покровск", "Покровск"),
            stop("s-c", "Вокзал Алдан", "Алдан"),
        ],
        routes: vec![
            route("r-ab", &["s-a", "s-b"], "bus", 500.0),
            route("r-bc", &["s-b", "s-c"], "train", 1500.0),
        ],
        flights: vec![
            flight("f-ab", "r-ab", "s-a", "s-b", "08:00", "09:00", 500.0),
            flight("f-bc", "r-bc", "s-b", "s-c", "09:30", "11:30", 1500.0),
        ],
    }
}

fn hub_only_snapshot() -> UpstreamSnapshot {
    UpstreamSnapshot {
        stops: vec![stop("s-hub", "Автовокзал Якутск", "Якутск")],
        routes: Vec::new(),
        flights: Vec::new(),
    }
}

#[tokio::test]
async fn happy_path_two_segment_itinerary() {
    let harness = harness(three_city_snapshot());
    harness.orchestrator.run_pipeline().await.unwrap();

    let plan = harness
        .routing
        .search(&RouteQuery {
            from: "Якутск".to_owned(),
            to: "Алдан".to_owned(),
            date: Some(Utc::now().date_naive()),
            passengers: 2,
        })
        .await
        .unwrap()
        .expect("expected an itinerary");

    let itinerary = &plan.primary;
    assert_eq!(itinerary.segments.len(), 2);
    assert!(itinerary.total_duration_minutes >= 180);
    assert_eq!(itinerary.total_price, 4000.0);
    assert_eq!(itinerary.transfer_count, 1);
    assert!(itinerary.segments[1].transfer_minutes >= 0);
    assert_eq!(
        itinerary.transport_kinds,
        vec![TransportKind::Bus, TransportKind::Train]
    );
    for pair in itinerary.segments.windows(2) {
        assert!(pair[1].departure >= pair[0].arrival);
    }
}

#[tokio::test]
async fn virtual_fallback_reaches_a_reference_only_city() {
    let harness = harness(hub_only_snapshot());
    harness.orchestrator.run_pipeline().await.unwrap();

    let graph = harness.store.get().unwrap();
    let virtual_stop = virtual_stop_id("Верхоянск");
    assert!(graph.contains_node(&virtual_stop));

    let plan = harness
        .routing
        .search(&RouteQuery {
            from: "Якутск".to_owned(),
            to: "Верхоянск".to_owned(),
            date: Some(Utc::now().date_naive() + chrono::Duration::days(1)),
            passengers: 1,
        })
        .await
        .unwrap()
        .expect("expected a virtual itinerary");

    assert_eq!(plan.primary.segments.len(), 1);
    let segment = &plan.primary.segments[0];
    assert!(segment.segment.is_virtual);
    // the synthesized morning departure wins
    assert_eq!(segment.flight.departure.format("%H:%M").to_string(), "08:00");
    assert_eq!(segment.price, 1000.0);
    assert_eq!(plan.risk.band, RiskBand::Medium);
}

#[tokio::test]
async fn virtual_closure_is_bidirectional_in_the_published_graph() {
    let harness = harness(hub_only_snapshot());
    harness.orchestrator.run_pipeline().await.unwrap();

    let graph = harness.store.get().unwrap();
    let dataset = harness
        .repos
        .datasets
        .get_latest()
        .await
        .unwrap()
        .unwrap();
    let hub = dataset
        .stops
        .iter()
        .find(|stop| !stop.is_virtual)
        .unwrap()
        .id
        .clone();

    let virtual_stops: Vec<_> = dataset
        .stops
        .iter()
        .filter(|stop| stop.is_virtual)
        .map(|stop| stop.id.clone())
        .collect();
    assert!(!virtual_stops.is_empty());
    for stop_id in &virtual_stops {
        assert!(graph.has_edge(&hub, stop_id), "missing edge to {stop_id}");
        assert!(graph.has_edge(stop_id, &hub), "missing edge from {stop_id}");
    }
}

#[tokio::test]
async fn malformed_stops_never_reach_the_dataset() {
    let mut snapshot = hub_only_snapshot();
    snapshot.stops.push(RawStop {
        external_id: "s-bad".to_owned(),
        name: "AB".to_owned(),
        latitude: Some(91.0),
        longitude: Some(-181.0),
        city: "туймаада".to_owned(),
        kind: None,
    });

    let harness = harness(snapshot);
    harness.orchestrator.run_pipeline().await.unwrap();

    let dataset = harness
        .repos
        .datasets
        .get_latest()
        .await
        .unwrap()
        .unwrap();
    assert!(!dataset
        .stops
        .iter()
        .any(|stop| stop.id.raw() == "s-bad"));
}

#[tokio::test]
async fn an_edge_with_no_signal_gets_the_fallback_weight() {
    let snapshot = UpstreamSnapshot {
        stops: vec![
            RawStop {
                latitude: None,
                longitude: None,
                ..stop("s-a", "Автовокзал Якутск", "Якутск")
            },
            RawStop {
                latitude: None,
                longitude: None,
                ..stop("s-b", "Автостанция Покровск", "Покровск")
            },
        ],
        routes: vec![RawRoute {
            base_fare: None,
            ..route("r-ab", &["s-a", "s-b"], "bus", 0.0)
        }],
        flights: Vec::new(),
    };
    let harness = harness(snapshot);
    harness.orchestrator.run_pipeline().await.unwrap();

    let graph = harness.store.get().unwrap();
    let edge = graph
        .edges()
        .find(|edge| edge.segment.route_id.raw() == "r-ab")
        .expect("edge should exist");
    assert_eq!(edge.weight, 60.0);
    assert!(graph.validate().is_ok());
}

#[tokio::test]
async fn identical_upstream_snapshots_change_nothing() {
    let harness = harness(three_city_snapshot());
    harness.orchestrator.run_pipeline().await.unwrap();

    let dataset_before = harness
        .repos
        .datasets
        .get_latest()
        .await
        .unwrap()
        .unwrap();
    let stats_before = harness.store.stats().unwrap();

    let report = harness.orchestrator.run_pipeline().await.unwrap();
    // ingestion reported "no changes" and the pipeline stopped there
    assert_eq!(report.runs.len(), 1);

    let dataset_after = harness
        .repos
        .datasets
        .get_latest()
        .await
        .unwrap()
        .unwrap();
    let stats_after = harness.store.stats().unwrap();
    assert_eq!(dataset_before.version, dataset_after.version);
    assert_eq!(dataset_before.created_at, dataset_after.created_at);
    assert_eq!(stats_before.built_at, stats_after.built_at);
    assert_eq!(stats_before.edge_count, stats_after.edge_count);
}
