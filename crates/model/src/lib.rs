use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod dataset;
pub mod flight;
pub mod graph;
pub mod itinerary;
pub mod risk;
pub mod route;
pub mod stop;

/// Geographic position. Latitude and longitude are degrees; validity ranges
/// are enforced by the stop validator, not here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
