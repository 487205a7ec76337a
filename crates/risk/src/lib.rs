//! Risk assessment of itineraries: historical-signal collection, feature
//! derivation and the deterministic rule-based scoring model.

use std::sync::Arc;

use model::{itinerary::Itinerary, risk::RiskAssessment};

pub mod features;
pub mod history;
pub mod score;

pub use features::{build_features, seasonality_factor, RiskFeatures};
pub use history::{
    HistoricalDataProvider, ProviderError, ScheduleRegularityProvider,
    SeasonalityProvider, SegmentHistory, WeatherProvider,
};
pub use score::{degraded_assessment, RiskModel, RuleBasedModel};

/// The four external signal sources the feature builder fans out to.
#[derive(Clone)]
pub struct RiskProviders {
    pub history: Arc<dyn HistoricalDataProvider>,
    pub regularity: Arc<dyn ScheduleRegularityProvider>,
    pub weather: Arc<dyn WeatherProvider>,
    pub seasonality: Arc<dyn SeasonalityProvider>,
}

impl RiskProviders {
    /// Deterministic built-in providers: fixed historical averages, the
    /// calendar seasonality rule, calm weather.
    pub fn defaults() -> Self {
        Self {
            history: Arc::new(history::StaticHistory::default()),
            regularity: Arc::new(history::SteadySchedule::default()),
            weather: Arc::new(history::CalmWeather::default()),
            seasonality: Arc::new(history::CalendarSeasonality),
        }
    }
}

/// Facade of the risk subsystem. Collects features for an itinerary and
/// scores them; when a provider fails, degrades to a default assessment
/// instead of failing the routing request.
pub struct RiskEngine {
    providers: RiskProviders,
    model: Arc<dyn RiskModel>,
}

impl RiskEngine {
    pub fn new(providers: RiskProviders, model: Arc<dyn RiskModel>) -> Self {
        Self { providers, model }
    }

    pub fn with_defaults() -> Self {
        Self::new(RiskProviders::defaults(), Arc::new(RuleBasedModel))
    }

    pub async fn assess(&self, itinerary: &Itinerary) -> RiskAssessment {
        match build_features(itinerary, &self.providers).await {
            Ok(features) => self.model.predict(&features),
            Err(why) => {
                log::warn!(
                    "risk providers degraded ({why}), falling back to default \
                     assessment"
                );
                degraded_assessment(itinerary)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use model::{risk::RiskBand, route::TransportKind};

    use super::*;

    struct FailingHistory;

    #[async_trait]
    impl HistoricalDataProvider for FailingHistory {
        async fn segment_history(
            &self,
            _route_id: &str,
        ) -> Result<SegmentHistory, ProviderError> {
            Err(ProviderError::new("history backend is down"))
        }
    }

    fn minimal_itinerary() -> Itinerary {
        use model::{
            flight::{Flight, FlightStatus},
            graph::Segment,
            itinerary::SegmentDetail,
        };
        use utility::id::Id;

        let departure = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        let arrival = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let flight = Flight {
            id: Id::new("f-1".to_owned()),
            route_id: Id::new("r-1".to_owned()),
            from_stop_id: Id::new("a".to_owned()),
            to_stop_id: Id::new("b".to_owned()),
            departure,
            arrival,
            price: 500.0,
            seats_available: 10,
            status: FlightStatus::Scheduled,
        };
        Itinerary {
            from_city: "якутск".to_owned(),
            to_city: "покровск".to_owned(),
            date: Some(departure.date_naive()),
            passengers: 1,
            segments: vec![SegmentDetail {
                segment: Segment {
                    segment_id: "r-1:0".to_owned(),
                    route_id: Id::new("r-1".to_owned()),
                    kind: TransportKind::Bus,
                    is_virtual: false,
                    distance_km: None,
                    duration_estimate_min: None,
                    base_price: None,
                },
                flight,
                departure,
                arrival,
                duration_minutes: 60,
                price: 500.0,
                transfer_minutes: 0,
            }],
            total_duration_minutes: 60,
            total_price: 500.0,
            transfer_count: 0,
            transport_kinds: vec![TransportKind::Bus],
            departure,
            arrival,
        }
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_medium() {
        let mut providers = RiskProviders::defaults();
        providers.history = Arc::new(FailingHistory);
        let engine = RiskEngine::new(providers, Arc::new(RuleBasedModel));

        let assessment = engine.assess(&minimal_itinerary()).await;
        assert_eq!(assessment.band, RiskBand::Medium);
        assert!(assessment
            .recommendations
            .iter()
            .any(|hint| hint.contains("degraded")));
    }

    #[tokio::test]
    async fn healthy_providers_produce_a_scored_assessment() {
        let engine = RiskEngine::with_defaults();
        let assessment = engine.assess(&minimal_itinerary()).await;
        assert!((1..=10).contains(&assessment.score));
    }
}
