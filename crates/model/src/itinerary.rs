use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{flight::Flight, graph::Segment, route::TransportKind};

/// One ridden leg of an itinerary: the segment, the flight chosen for it and
/// the timing derived from that flight. `transfer_minutes` is the wait before
/// boarding, clamped to zero, and is zero for the first leg.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDetail {
    pub segment: Segment,
    pub flight: Flight,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub duration_minutes: i64,
    pub price: f64,
    pub transfer_minutes: i64,
}

/// A timed, priced realization of one path through the graph.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub from_city: String,
    pub to_city: String,
    pub date: Option<NaiveDate>,
    pub passengers: u32,
    pub segments: Vec<SegmentDetail>,
    pub total_duration_minutes: i64,
    pub total_price: f64,
    pub transfer_count: usize,
    pub transport_kinds: Vec<TransportKind>,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
}

impl Itinerary {
    pub fn has_kind(&self, kind: TransportKind) -> bool {
        self.transport_kinds.contains(&kind)
    }

    pub fn longest_segment_minutes(&self) -> i64 {
        self.segments
            .iter()
            .map(|segment| segment.duration_minutes)
            .max()
            .unwrap_or(0)
    }

    pub fn shortest_transfer_minutes(&self) -> Option<i64> {
        self.segments
            .iter()
            .skip(1)
            .map(|segment| segment.transfer_minutes)
            .min()
    }
}
