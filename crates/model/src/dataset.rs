use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{flight::Flight, route::Route, stop::Stop};

/// Immutable snapshot of the transport network as ingested from one upstream
/// fetch, plus the virtual entities synthesized for it. A dataset is active
/// exactly while the graph built from it is the published one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub version: String,
    pub hash: String,
    pub source_mode: SourceMode,
    pub quality_score: u8,
    pub created_at: DateTime<Utc>,
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub flights: Vec<Flight>,
}

impl Dataset {
    pub fn stop(&self, id: &Id<Stop>) -> Option<&Stop> {
        self.stops.iter().find(|stop| &stop.id == id)
    }

    pub fn has_stop(&self, id: &Id<Stop>) -> bool {
        self.stop(id).is_some()
    }

    pub fn has_route(&self, id: &Id<Route>) -> bool {
        self.routes.iter().any(|route| &route.id == id)
    }

    /// Stops of one city, real before virtual, in dataset order.
    pub fn stops_in_city<'a>(
        &'a self,
        city: &'a str,
    ) -> impl Iterator<Item = &'a Stop> {
        self.stops
            .iter()
            .filter(move |stop| stop.city == city && !stop.is_virtual)
            .chain(
                self.stops
                    .iter()
                    .filter(move |stop| stop.city == city && stop.is_virtual),
            )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Real,
    Recovery,
    Mock,
    Unknown,
}

/// Dataset row as persisted without the record collections, for listings and
/// diffing against a fresh upstream hash.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub version: String,
    pub hash: String,
    pub source_mode: SourceMode,
    pub quality_score: u8,
    pub created_at: DateTime<Utc>,
    pub stop_count: usize,
    pub route_count: usize,
    pub flight_count: usize,
    pub is_active: bool,
}

impl DatasetSummary {
    pub fn of(dataset: &Dataset, is_active: bool) -> Self {
        Self {
            version: dataset.version.clone(),
            hash: dataset.hash.clone(),
            source_mode: dataset.source_mode,
            quality_score: dataset.quality_score,
            created_at: dataset.created_at,
            stop_count: dataset.stops.len(),
            route_count: dataset.routes.len(),
            flight_count: dataset.flights.len(),
            is_active,
        }
    }
}
