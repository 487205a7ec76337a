use std::{collections::HashSet, error::Error, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use model::{
    dataset::Dataset,
    flight::{Flight, FlightStatus},
    route::{Route, TransportKind},
    stop::{Stop, StopKind},
    Location,
};
use reference::{normalize_city, validate_stop};
use sha2::{Digest, Sha256};
use storage::CITIES_CACHE_KEY;
use upstream::{UpstreamProvider, UpstreamSnapshot};
use utility::id::Id;

use crate::worker::{
    Worker, WorkerContext, WorkerError, WorkerReport, WorkerState,
    INGESTION_WORKER, VIRTUAL_ENTITY_WORKER,
};

/// Object-storage stand-in for raw snapshot backups. Failures are warnings,
/// never ingestion failures.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn store_snapshot(
        &self,
        version: &str,
        payload: &[u8],
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// W1: fetches the upstream snapshot, detects changes by hash, normalizes
/// and validates records, and persists a fresh dataset version.
pub struct IngestionWorker {
    provider: Arc<dyn UpstreamProvider>,
    sink: Option<Arc<dyn SnapshotSink>>,
    state: WorkerState,
}

impl IngestionWorker {
    pub fn new(provider: Arc<dyn UpstreamProvider>) -> Self {
        Self {
            provider,
            sink: None,
            state: WorkerState::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

#[async_trait]
impl Worker for IngestionWorker {
    fn id(&self) -> &'static str {
        INGESTION_WORKER
    }

    fn state(&self) -> &WorkerState {
        &self.state
    }

    async fn can_run(&self, context: &WorkerContext) -> bool {
        let metadata = self.state.snapshot();
        match metadata.last_success {
            Some(last_success) => {
                let elapsed = Utc::now() - last_success;
                elapsed.to_std().map_or(true, |elapsed| {
                    elapsed >= context.config.ingest_cooldown
                })
            }
            None => true,
        }
    }

    async fn execute(
        &self,
        context: &WorkerContext,
    ) -> Result<WorkerReport, WorkerError> {
        let snapshot = self.provider.fetch_all().await?;
        let canonical = snapshot
            .canonical_json()
            .map_err(storage::StorageError::from)?;
        let hash = sha256_hex(&canonical);

        // change detection runs against the hash that was advanced by the
        // last successful build, so a failed build gets retried
        let active = active_dataset(context).await?;
        if let Some(active) = &active {
            if active.hash == hash {
                log::info!("upstream snapshot unchanged (hash {hash})");
                return Ok(WorkerReport::completed(0, "no changes", None));
            }
        }

        if self.state.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }

        let today = Utc::now().date_naive();
        let parsed = parse_snapshot(&snapshot, today);
        let version = format!("ds-{}", &hash[..12]);

        context.repos.stops.save_bulk(&parsed.stops).await?;
        context.repos.routes.save_bulk(&parsed.routes).await?;
        context.repos.flights.save_bulk(&parsed.flights).await?;

        let quality_score =
            quality_score(&parsed.stops, &parsed.routes, &parsed.flights);
        let processed =
            parsed.stops.len() + parsed.routes.len() + parsed.flights.len();
        let dataset = Dataset {
            version: version.clone(),
            hash,
            source_mode: self.provider.mode(),
            quality_score,
            created_at: Utc::now(),
            stops: parsed.stops,
            routes: parsed.routes,
            flights: parsed.flights,
        };
        context.repos.datasets.save(&dataset).await?;

        if let Some(sink) = &self.sink {
            if let Err(why) = sink.store_snapshot(&version, &canonical).await {
                log::warn!("snapshot backup failed (non-fatal): {why}");
            }
        }

        context.repos.cache.delete(CITIES_CACHE_KEY).await?;

        log::info!(
            "ingested dataset {version}: {} stops, {} routes, {} flights, \
             quality {quality_score}",
            dataset.stops.len(),
            dataset.routes.len(),
            dataset.flights.len(),
        );
        Ok(WorkerReport::completed(
            processed,
            format!("dataset {version}"),
            Some(VIRTUAL_ENTITY_WORKER),
        ))
    }
}

async fn active_dataset(
    context: &WorkerContext,
) -> Result<Option<Dataset>, WorkerError> {
    let Some(version) = context.repos.datasets.active_version().await? else {
        return Ok(None);
    };
    Ok(context.repos.datasets.get(&version).await?)
}

fn sha256_hex(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    digest.iter().fold(
        String::with_capacity(digest.len() * 2),
        |mut hex, byte| {
            use std::fmt::Write as _;
            let _ = write!(hex, "{byte:02x}");
            hex
        },
    )
}

struct ParsedSnapshot {
    stops: Vec<Stop>,
    routes: Vec<Route>,
    flights: Vec<Flight>,
}

/// Normalizes and validates the raw records. Anything malformed is dropped
/// with a warning; routes and flights referencing dropped records fall with
/// them.
fn parse_snapshot(snapshot: &UpstreamSnapshot, today: NaiveDate) -> ParsedSnapshot {
    let mut stops = Vec::with_capacity(snapshot.stops.len());
    for raw in &snapshot.stops {
        let location = raw
            .latitude
            .zip(raw.longitude)
            .map(|(latitude, longitude)| Location::new(latitude, longitude));
        let stop = Stop {
            id: Id::new(raw.external_id.clone()),
            name: raw.name.clone(),
            location,
            city: normalize_city(&raw.city),
            kind: stop_kind_of(raw.kind.as_deref()),
            is_virtual: false,
        };
        let validation = validate_stop(&stop);
        if !validation.valid {
            log::warn!(
                "dropping stop {}: {}",
                raw.external_id,
                validation.errors.join("; ")
            );
            continue;
        }
        stops.push(stop);
    }
    let kept_stops: HashSet<String> =
        stops.iter().map(|stop| stop.id.raw()).collect();

    let mut routes = Vec::with_capacity(snapshot.routes.len());
    for raw in &snapshot.routes {
        if raw.stop_external_ids.len() < 2 {
            log::warn!(
                "dropping route {}: fewer than two stops",
                raw.external_id
            );
            continue;
        }
        if raw
            .stop_external_ids
            .iter()
            .any(|stop_id| !kept_stops.contains(stop_id))
        {
            log::warn!(
                "dropping route {}: references a dropped stop",
                raw.external_id
            );
            continue;
        }
        routes.push(Route {
            id: Id::new(raw.external_id.clone()),
            stop_ids: raw
                .stop_external_ids
                .iter()
                .map(|stop_id| Id::new(stop_id.clone()))
                .collect(),
            kind: raw
                .kind
                .as_deref()
                .map(TransportKind::from_label)
                .unwrap_or(TransportKind::Bus),
            number: raw.number.clone(),
            operator: raw.operator.clone(),
            base_fare: raw.base_fare,
            is_virtual: false,
        });
    }
    let kept_routes: HashSet<String> =
        routes.iter().map(|route| route.id.raw()).collect();

    let mut flights = Vec::with_capacity(snapshot.flights.len());
    for raw in &snapshot.flights {
        if !kept_routes.contains(&raw.route_external_id)
            || !kept_stops.contains(&raw.from_stop_external_id)
            || !kept_stops.contains(&raw.to_stop_external_id)
        {
            log::warn!(
                "dropping flight {}: references a dropped record",
                raw.external_id
            );
            continue;
        }
        let Some(departure) = coerce_timestamp(&raw.departure, today) else {
            log::warn!(
                "dropping flight {}: unreadable departure {:?}",
                raw.external_id,
                raw.departure
            );
            continue;
        };
        let Some(mut arrival) = coerce_timestamp(&raw.arrival, today) else {
            log::warn!(
                "dropping flight {}: unreadable arrival {:?}",
                raw.external_id,
                raw.arrival
            );
            continue;
        };
        // wall-clock arrivals before the departure belong to the next day
        if arrival < departure {
            arrival += chrono::Duration::days(1);
        }
        flights.push(Flight {
            id: Id::new(raw.external_id.clone()),
            route_id: Id::new(raw.route_external_id.clone()),
            from_stop_id: Id::new(raw.from_stop_external_id.clone()),
            to_stop_id: Id::new(raw.to_stop_external_id.clone()),
            departure,
            arrival,
            price: raw.price.unwrap_or(0.0),
            seats_available: raw.seats_available.unwrap_or(0),
            status: flight_status_of(raw.status.as_deref()),
        });
    }

    ParsedSnapshot {
        stops,
        routes,
        flights,
    }
}

fn stop_kind_of(hint: Option<&str>) -> StopKind {
    let Some(hint) = hint else {
        return StopKind::Generic;
    };
    let hint = hint.to_lowercase();
    if hint.contains("airport") || hint.contains("аэропорт") {
        StopKind::Airport
    } else if hint.contains("rail")
        || hint.contains("жд")
        || hint.contains("вокзал")
    {
        StopKind::Railway
    } else if hint.contains("ferry")
        || hint.contains("причал")
        || hint.contains("порт")
    {
        StopKind::FerryTerminal
    } else {
        StopKind::Generic
    }
}

fn flight_status_of(raw: Option<&str>) -> FlightStatus {
    match raw.map(str::to_lowercase).as_deref() {
        Some("cancelled") | Some("canceled") | Some("отменен") => {
            FlightStatus::Cancelled
        }
        Some("departed") | Some("отправлен") => FlightStatus::Departed,
        Some("scheduled") | Some("по расписанию") | None => {
            FlightStatus::Scheduled
        }
        Some(_) => FlightStatus::Unknown,
    }
}

/// Accepts full ISO timestamps or wall-clock `HH:MM` on the snapshot date.
fn coerce_timestamp(raw: &str, base: NaiveDate) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M") {
        return Some(base.and_time(time).and_utc());
    }
    None
}

/// Dataset completeness, 0..=100: the mean of three subscores for stops,
/// routes, and flights. Each subscore grants 50 points for being non-empty
/// and up to 50 more for metadata coverage.
fn quality_score(stops: &[Stop], routes: &[Route], flights: &[Flight]) -> u8 {
    let ratio_score = |total: usize, with_metadata: usize| {
        if total == 0 {
            0.0
        } else {
            50.0 + 50.0 * with_metadata as f64 / total as f64
        }
    };

    let stop_score = ratio_score(
        stops.len(),
        stops.iter().filter(|stop| stop.location.is_some()).count(),
    );
    let route_score = ratio_score(
        routes.len(),
        routes
            .iter()
            .filter(|route| {
                route.operator.is_some() || route.base_fare.is_some()
            })
            .count(),
    );
    let flight_score = ratio_score(
        flights.len(),
        flights.iter().filter(|flight| flight.price > 0.0).count(),
    );

    (((stop_score + route_score + flight_score) / 3.0).round()) as u8
}
