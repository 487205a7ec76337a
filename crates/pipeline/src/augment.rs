use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use model::{
    flight::{Flight, FlightStatus},
    route::{Route, TransportKind},
    stop::{Stop, StopKind},
    Location,
};
use reference::{reference_cities, virtual_route_id, virtual_stop_id, HUB_CITY};
use utility::id::Id;

use crate::worker::{
    Worker, WorkerContext, WorkerError, WorkerReport, WorkerState,
    GRAPH_BUILD_WORKER, VIRTUAL_ENTITY_WORKER,
};

/// Flight time assumed for a virtual leg touching the hub, minutes.
const HUB_EDGE_DURATION_MIN: i64 = 180;
/// Flight time assumed for a direct leg between two virtual stops, minutes.
const DIRECT_EDGE_DURATION_MIN: i64 = 120;
const VIRTUAL_TRIP_PRICE: f64 = 1000.0;
const VIRTUAL_TRIP_SEATS: u32 = 50;
const VIRTUAL_SCHEDULE_DAYS: i64 = 365;
/// Departures synthesized per day, local wall clock. The whole system keeps
/// timestamps in wall-clock terms, the same convention the ingestion worker
/// applies to `HH:MM` upstream times.
const VIRTUAL_DEPARTURE_HOURS: [u32; 2] = [8, 16];

/// W2: guarantees that every reference city is reachable. Missing cities get
/// a virtual stop at the reference coordinates, virtual routes in both
/// directions around the hub, and a year of synthesized trips. Every
/// identifier is a pure function of its inputs, so re-running creates
/// nothing new.
pub struct VirtualEntityWorker {
    state: WorkerState,
}

impl VirtualEntityWorker {
    pub fn new() -> Self {
        Self {
            state: WorkerState::new(),
        }
    }
}

impl Default for VirtualEntityWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for VirtualEntityWorker {
    fn id(&self) -> &'static str {
        VIRTUAL_ENTITY_WORKER
    }

    fn state(&self) -> &WorkerState {
        &self.state
    }

    async fn execute(
        &self,
        context: &WorkerContext,
    ) -> Result<WorkerReport, WorkerError> {
        if !context.config.use_adaptive_data_loading {
            return Ok(WorkerReport::skipped(
                "adaptive data loading is disabled",
                Some(GRAPH_BUILD_WORKER),
            ));
        }

        let Some(mut dataset) = context.repos.datasets.get_latest().await?
        else {
            return Ok(WorkerReport::skipped(
                "no dataset to augment",
                Some(GRAPH_BUILD_WORKER),
            ));
        };

        // (a) a virtual stop for every reference city without one
        let covered: HashSet<String> = dataset
            .stops
            .iter()
            .map(|stop| stop.city.clone())
            .collect();
        let new_stops: Vec<Stop> = reference_cities()
            .iter()
            .filter(|city| !covered.contains(city.key))
            .map(|city| Stop {
                id: virtual_stop_id(city.key),
                name: city.name.to_owned(),
                location: Some(Location::new(city.latitude, city.longitude)),
                city: city.key.to_owned(),
                kind: StopKind::Generic,
                is_virtual: true,
            })
            .collect();
        dataset.stops.extend(new_stops.iter().cloned());

        let hub_stop_id = dataset
            .stops_in_city(HUB_CITY)
            .next()
            .map(|stop| stop.id.clone());
        let virtual_stop_ids: Vec<Id<Stop>> = dataset
            .stops
            .iter()
            .filter(|stop| stop.is_virtual)
            .map(|stop| stop.id.clone())
            .collect();

        if self.state.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }

        // (b)/(c) virtual routes, each direction created independently
        let mut new_routes: Vec<Route> = Vec::new();
        match &hub_stop_id {
            Some(hub) => {
                for stop_id in &virtual_stop_ids {
                    if stop_id == hub {
                        continue;
                    }
                    for (from, to) in [(stop_id, hub), (hub, stop_id)] {
                        if let Some(route) =
                            missing_virtual_route(&dataset, &new_routes, from, to)
                        {
                            new_routes.push(route);
                        }
                    }
                }
            }
            None => {
                for from in &virtual_stop_ids {
                    for to in &virtual_stop_ids {
                        if from == to {
                            continue;
                        }
                        if let Some(route) =
                            missing_virtual_route(&dataset, &new_routes, from, to)
                        {
                            new_routes.push(route);
                        }
                    }
                }
            }
        }
        dataset.routes.extend(new_routes.iter().cloned());

        // (d) two synthesized trips per day for a year ahead
        let existing_flights: HashSet<String> = dataset
            .flights
            .iter()
            .map(|flight| flight.id.raw())
            .collect();
        let start = Utc::now().date_naive();
        let mut new_flights: Vec<Flight> = Vec::new();
        for route in dataset.routes.iter().filter(|route| route.is_virtual) {
            let (Some(from), Some(to)) =
                (route.stop_ids.first(), route.stop_ids.get(1))
            else {
                continue;
            };
            let touches_hub = hub_stop_id
                .as_ref()
                .map(|hub| hub == from || hub == to)
                .unwrap_or(false);
            let duration = if touches_hub {
                HUB_EDGE_DURATION_MIN
            } else {
                DIRECT_EDGE_DURATION_MIN
            };
            for day in 0..VIRTUAL_SCHEDULE_DAYS {
                let date = start + Duration::days(day);
                for hour in VIRTUAL_DEPARTURE_HOURS {
                    let flight_id = virtual_flight_id(&route.id, date, hour);
                    if existing_flights.contains(&flight_id) {
                        continue;
                    }
                    let Some(local) = date.and_hms_opt(hour, 0, 0) else {
                        continue;
                    };
                    let departure = local.and_utc();
                    new_flights.push(Flight {
                        id: Id::new(flight_id),
                        route_id: route.id.clone(),
                        from_stop_id: from.clone(),
                        to_stop_id: to.clone(),
                        departure,
                        arrival: departure + Duration::minutes(duration),
                        price: VIRTUAL_TRIP_PRICE,
                        seats_available: VIRTUAL_TRIP_SEATS,
                        status: FlightStatus::Scheduled,
                    });
                }
            }
        }
        dataset.flights.extend(new_flights.iter().cloned());

        let created = new_stops.len() + new_routes.len() + new_flights.len();
        if created > 0 {
            context.repos.stops.save_bulk(&new_stops).await?;
            context.repos.routes.save_bulk(&new_routes).await?;
            context.repos.flights.save_bulk(&new_flights).await?;
            context.repos.datasets.save(&dataset).await?;
            log::info!(
                "augmented dataset {}: {} virtual stops, {} virtual routes, \
                 {} synthesized trips",
                dataset.version,
                new_stops.len(),
                new_routes.len(),
                new_flights.len()
            );
        } else {
            log::info!(
                "dataset {} already fully augmented",
                dataset.version
            );
        }

        Ok(WorkerReport::completed(
            created,
            format!("dataset {}", dataset.version),
            Some(GRAPH_BUILD_WORKER),
        ))
    }
}

fn virtual_flight_id(
    route_id: &Id<Route>,
    date: NaiveDate,
    hour: u32,
) -> String {
    format!("virtual-flight-{route_id}-{}-{hour:02}", date.format("%Y%m%d"))
}

fn missing_virtual_route(
    dataset: &model::dataset::Dataset,
    pending: &[Route],
    from: &Id<Stop>,
    to: &Id<Stop>,
) -> Option<Route> {
    let id = virtual_route_id(from, to);
    if dataset.has_route(&id) || pending.iter().any(|route| route.id == id) {
        return None;
    }
    Some(Route {
        id,
        stop_ids: vec![from.clone(), to.clone()],
        kind: TransportKind::Bus,
        number: None,
        operator: None,
        base_fare: Some(VIRTUAL_TRIP_PRICE),
        is_virtual: true,
    })
}
