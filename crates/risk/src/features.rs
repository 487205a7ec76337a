use futures::future::try_join_all;
use model::{itinerary::Itinerary, route::TransportKind};
use serde::{Deserialize, Serialize};

use crate::{
    history::{ProviderError, SegmentHistory},
    RiskProviders,
};

/// Re-exported calendar rule; the default seasonality provider applies it.
pub use crate::history::calendar_season_factor as seasonality_factor;

const HIGH_OCCUPANCY_THRESHOLD: f64 = 0.9;
const LOW_AVAILABILITY_SEATS: u32 = 5;

/// Everything the risk model looks at, derived from one itinerary and the
/// collected historical signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFeatures {
    pub transfer_count: usize,
    pub segment_count: usize,
    pub total_duration_minutes: i64,
    pub longest_segment_minutes: i64,
    pub shortest_transfer_minutes: Option<i64>,
    pub transport_kinds: Vec<TransportKind>,
    pub has_ferry: bool,
    pub has_river_transport: bool,
    pub has_mixed_transport: bool,
    pub has_bus: bool,
    pub avg_delay_90d_minutes: f64,
    pub delay_frequency_90d: f64,
    pub cancellation_rate_90d: f64,
    pub avg_occupancy: f64,
    pub high_occupancy_segments: usize,
    pub low_availability_segments: usize,
    pub schedule_regularity: f64,
    pub weather_risk: f64,
    pub season_factor: f64,
}

impl RiskFeatures {
    /// Named numeric rendering of the record: durations scaled to hours, the
    /// transport-kind set one-hot encoded. This is the vector a learned model
    /// would consume in place of the rule table.
    pub fn to_vector(&self) -> Vec<(String, f64)> {
        let mut vector = vec![
            ("transfer_count".to_owned(), self.transfer_count as f64),
            ("segment_count".to_owned(), self.segment_count as f64),
            (
                "total_duration_hours".to_owned(),
                self.total_duration_minutes as f64 / 60.0,
            ),
            (
                "longest_segment_hours".to_owned(),
                self.longest_segment_minutes as f64 / 60.0,
            ),
            (
                "shortest_transfer_hours".to_owned(),
                self.shortest_transfer_minutes.unwrap_or(0) as f64 / 60.0,
            ),
            (
                "avg_delay_90d_minutes".to_owned(),
                self.avg_delay_90d_minutes,
            ),
            ("delay_frequency_90d".to_owned(), self.delay_frequency_90d),
            (
                "cancellation_rate_90d".to_owned(),
                self.cancellation_rate_90d,
            ),
            ("avg_occupancy".to_owned(), self.avg_occupancy),
            (
                "high_occupancy_segments".to_owned(),
                self.high_occupancy_segments as f64,
            ),
            (
                "low_availability_segments".to_owned(),
                self.low_availability_segments as f64,
            ),
            (
                "schedule_regularity".to_owned(),
                self.schedule_regularity,
            ),
            ("weather_risk".to_owned(), self.weather_risk),
            ("season_factor".to_owned(), self.season_factor),
            (
                "has_mixed_transport".to_owned(),
                one_hot(self.has_mixed_transport),
            ),
        ];
        for kind in [
            TransportKind::Airplane,
            TransportKind::Bus,
            TransportKind::Train,
            TransportKind::Ferry,
            TransportKind::Taxi,
        ] {
            vector.push((
                format!("kind_{kind}"),
                one_hot(self.transport_kinds.contains(&kind)),
            ));
        }
        vector
    }
}

fn one_hot(set: bool) -> f64 {
    if set {
        1.0
    } else {
        0.0
    }
}

/// Collects the four external signals in parallel and folds them together
/// with the itinerary's own shape.
pub async fn build_features(
    itinerary: &Itinerary,
    providers: &RiskProviders,
) -> Result<RiskFeatures, ProviderError> {
    let route_ids: Vec<String> = {
        let mut ids: Vec<String> = itinerary
            .segments
            .iter()
            .map(|segment| segment.segment.route_id.raw())
            .collect();
        ids.dedup();
        ids
    };
    let cities =
        vec![itinerary.from_city.clone(), itinerary.to_city.clone()];

    let histories = async {
        try_join_all(
            route_ids
                .iter()
                .map(|route_id| providers.history.segment_history(route_id)),
        )
        .await
    };
    let regularities = async {
        try_join_all(
            route_ids
                .iter()
                .map(|route_id| providers.regularity.regularity(route_id)),
        )
        .await
    };
    let weather = providers.weather.route_weather_risk(&cities, itinerary.date);
    let season = providers.seasonality.season_factor(itinerary.date);

    let (histories, regularities, weather_risk, season_factor) =
        tokio::join!(histories, regularities, weather, season);
    let histories = histories?;
    let regularities = regularities?;
    let weather_risk = weather_risk?;
    let season_factor = season_factor?;

    let avg = |values: &[f64]| {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };

    let delays: Vec<f64> = histories
        .iter()
        .map(|history| history.avg_delay_90d_minutes)
        .collect();
    let frequencies: Vec<f64> = histories
        .iter()
        .map(|history| history.delay_frequency_90d)
        .collect();
    let cancellations: Vec<f64> = histories
        .iter()
        .map(|history| history.cancellation_rate_90d)
        .collect();
    let occupancies: Vec<f64> = histories
        .iter()
        .map(|history| history.avg_occupancy)
        .collect();

    let kinds = &itinerary.transport_kinds;
    let has_ferry = kinds.contains(&TransportKind::Ferry);

    Ok(RiskFeatures {
        transfer_count: itinerary.transfer_count,
        segment_count: itinerary.segments.len(),
        total_duration_minutes: itinerary.total_duration_minutes,
        longest_segment_minutes: itinerary.longest_segment_minutes(),
        shortest_transfer_minutes: itinerary.shortest_transfer_minutes(),
        transport_kinds: kinds.clone(),
        has_ferry,
        // the regional water network is river-borne, so ferry legs are river
        // transport here
        has_river_transport: has_ferry,
        has_mixed_transport: kinds.len() > 1,
        has_bus: kinds.contains(&TransportKind::Bus),
        avg_delay_90d_minutes: avg(&delays),
        delay_frequency_90d: avg(&frequencies),
        cancellation_rate_90d: avg(&cancellations),
        avg_occupancy: avg(&occupancies),
        high_occupancy_segments: occupancy_exceeding(
            &histories,
            HIGH_OCCUPANCY_THRESHOLD,
        ),
        low_availability_segments: itinerary
            .segments
            .iter()
            .filter(|segment| {
                segment.flight.seats_available < LOW_AVAILABILITY_SEATS
            })
            .count(),
        schedule_regularity: avg(&regularities),
        weather_risk,
        season_factor,
    })
}

fn occupancy_exceeding(histories: &[SegmentHistory], threshold: f64) -> usize {
    histories
        .iter()
        .filter(|history| history.avg_occupancy > threshold)
        .count()
}
