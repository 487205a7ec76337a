use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{route::Route, stop::Stop};

/// One timed traversal of a single edge: a departure from one stop arriving
/// at the next along a route. Arrival never precedes departure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: Id<Flight>,
    pub route_id: Id<Route>,
    pub from_stop_id: Id<Stop>,
    pub to_stop_id: Id<Stop>,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub price: f64,
    pub seats_available: u32,
    pub status: FlightStatus,
}

impl HasId for Flight {
    type IdType = String;
}

impl Flight {
    pub fn duration_minutes(&self) -> i64 {
        (self.arrival - self.departure).num_minutes()
    }

    pub fn has_seats(&self) -> bool {
        self.seats_available > 0
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    Scheduled,
    Cancelled,
    Departed,
    Unknown,
}

impl Default for FlightStatus {
    fn default() -> Self {
        Self::Scheduled
    }
}
