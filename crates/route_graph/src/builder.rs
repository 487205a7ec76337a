use std::{collections::HashMap, error, fmt};

use model::{
    dataset::Dataset,
    flight::Flight,
    graph::{Edge, Graph, InvariantViolation, Node, Segment},
    route::TransportKind,
    stop::Stop,
};
use utility::geo::haversine_distance;

/// Fallback weight for edges nothing else can price, minutes.
const VIRTUAL_FALLBACK_WEIGHT: f64 = 60.0;
/// Trip durations at or beyond this are treated as data errors.
const MAX_TRIP_DURATION_MIN: f64 = 10000.0;

#[derive(Debug)]
pub enum BuildError {
    Invariant(InvariantViolation),
    InvalidWeight {
        from: String,
        to: String,
        weight: f64,
    },
    Storage(storage::StorageError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Invariant(violation) => {
                write!(f, "graph invariant violated: {violation}")
            }
            BuildError::InvalidWeight { from, to, weight } => {
                write!(
                    f,
                    "weight audit failed on edge {from} -> {to}: {weight}"
                )
            }
            BuildError::Storage(why) => {
                write!(f, "graph persistence failed: {why}")
            }
        }
    }
}

impl error::Error for BuildError {}

impl From<InvariantViolation> for BuildError {
    fn from(violation: InvariantViolation) -> Self {
        BuildError::Invariant(violation)
    }
}

/// Average speed by transport kind, km/h, for estimating segment durations
/// where no timetable exists.
fn cruise_speed_kmh(kind: TransportKind) -> f64 {
    match kind {
        TransportKind::Airplane => 500.0,
        TransportKind::Train => 60.0,
        TransportKind::Bus => 50.0,
        TransportKind::Ferry => 25.0,
        TransportKind::Taxi => 70.0,
        TransportKind::Unknown => 50.0,
    }
}

/// Materializes a fresh graph from a dataset.
///
/// Nodes come from every stop whose id passes the virtual-id stability
/// check; edges from every consecutive stop pair of every route, weighted by
/// the cascade in `edge_weight`. After assembly the graph is synchronized
/// and validated (twice, if the first validation fails), then every weight
/// is audited once more. The caller publishes the result; a build error
/// leaves the previously published graph untouched.
pub fn build_graph(dataset: &Dataset) -> Result<Graph, BuildError> {
    let mut graph = Graph::new();

    for stop in &dataset.stops {
        if stop.is_virtual {
            let canonical = reference::virtual_stop_id(&stop.city);
            if stop.id != canonical {
                log::warn!(
                    "dropping virtual stop {} (canonical id would be {})",
                    stop.id,
                    canonical
                );
                continue;
            }
        }
        graph.add_node(Node::of_stop(stop));
    }

    let flights_by_leg = index_flights(dataset);
    let stops_by_id: HashMap<&str, &Stop> = dataset
        .stops
        .iter()
        .map(|stop| (stop.id.raw_ref::<str>(), stop))
        .collect();

    for route in &dataset.routes {
        for (position, (from, to)) in route.segments().enumerate() {
            let leg_key = (
                route.id.raw(),
                from.raw(),
                to.raw(),
            );
            let flights = flights_by_leg
                .get(&leg_key)
                .cloned()
                .unwrap_or_default();

            let distance_km = stops_by_id
                .get(from.raw_ref::<str>())
                .and_then(|stop| stop.location)
                .zip(
                    stops_by_id
                        .get(to.raw_ref::<str>())
                        .and_then(|stop| stop.location),
                )
                .map(|(a, b)| {
                    haversine_distance(
                        a.latitude,
                        a.longitude,
                        b.latitude,
                        b.longitude,
                    )
                });

            let segment = Segment {
                segment_id: format!("{}:{position}", route.id),
                route_id: route.id.clone(),
                kind: route.kind,
                is_virtual: route.is_virtual,
                distance_km,
                duration_estimate_min: distance_km.map(|km| {
                    km / cruise_speed_kmh(route.kind) * 60.0
                }),
                base_price: route.base_fare,
            };

            let weight = edge_weight(&flights, &segment);
            if !weight.is_finite() || weight <= 0.0 {
                log::error!(
                    "skipping edge {from} -> {to} of route {}: weight {weight}",
                    route.id
                );
                continue;
            }

            let added = graph.add_edge(Edge {
                from: from.clone(),
                to: to.clone(),
                segment,
                weight,
                flights,
            });
            if !added {
                log::warn!(
                    "skipping edge {from} -> {to} of route {}: missing endpoint",
                    route.id
                );
            }
        }
    }

    let removed = graph.synchronize();
    if removed > 0 {
        log::warn!("synchronize removed {removed} stale edges");
    }
    if let Err(violation) = graph.validate() {
        log::warn!("validation failed ({violation}), synchronizing again");
        graph.synchronize();
        graph.validate()?;
    }

    audit_weights(&graph)?;

    log::info!(
        "built graph from dataset {}: {} nodes, {} edges",
        dataset.version,
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

/// Weight cascade. The first rule yielding a finite positive number wins:
/// minimum observed trip duration, then the segment's estimated duration,
/// then a conversion of the base price, then the flat virtual fallback.
fn edge_weight(flights: &[Flight], segment: &Segment) -> f64 {
    let min_trip_duration = flights
        .iter()
        .map(|flight| flight.duration_minutes() as f64)
        .filter(|minutes| {
            minutes.is_finite()
                && *minutes >= 0.0
                && *minutes < MAX_TRIP_DURATION_MIN
        })
        .fold(f64::INFINITY, f64::min);
    if min_trip_duration.is_finite() && min_trip_duration > 0.0 {
        return min_trip_duration;
    }

    if let Some(estimate) = segment.duration_estimate_min {
        if estimate.is_finite() && estimate > 0.0 {
            return estimate;
        }
    }

    if let Some(base_price) = segment.base_price {
        if base_price.is_finite() {
            return (base_price / 1000.0 * 60.0).round().max(1.0);
        }
    }

    VIRTUAL_FALLBACK_WEIGHT
}

fn index_flights(
    dataset: &Dataset,
) -> HashMap<(String, String, String), Vec<Flight>> {
    let mut by_leg: HashMap<(String, String, String), Vec<Flight>> =
        HashMap::new();
    for flight in &dataset.flights {
        by_leg
            .entry((
                flight.route_id.raw(),
                flight.from_stop_id.raw(),
                flight.to_stop_id.raw(),
            ))
            .or_default()
            .push(flight.clone());
    }
    by_leg
}

fn audit_weights(graph: &Graph) -> Result<(), BuildError> {
    for edge in graph.edges() {
        if !edge.weight.is_finite() || edge.weight <= 0.0 {
            return Err(BuildError::InvalidWeight {
                from: edge.from.raw(),
                to: edge.to.raw(),
                weight: edge.weight,
            });
        }
    }
    Ok(())
}
