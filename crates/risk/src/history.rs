use std::{error, fmt};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A signal provider failed. The engine treats any provider failure as
/// degradation, never as a routing failure.
#[derive(Debug, Clone)]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "risk provider failed: {}", self.message)
    }
}

impl error::Error for ProviderError {}

/// Aggregated punctuality history of one route segment over the rolling
/// 30/60/90 day windows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentHistory {
    pub avg_delay_30d_minutes: f64,
    pub avg_delay_60d_minutes: f64,
    pub avg_delay_90d_minutes: f64,
    /// Share of departures in the 90-day window that left late.
    pub delay_frequency_90d: f64,
    pub cancellation_rate_90d: f64,
    /// Mean seat occupancy, 0..1.
    pub avg_occupancy: f64,
}

#[async_trait]
pub trait HistoricalDataProvider: Send + Sync {
    async fn segment_history(
        &self,
        route_id: &str,
    ) -> Result<SegmentHistory, ProviderError>;
}

#[async_trait]
pub trait ScheduleRegularityProvider: Send + Sync {
    /// How regularly the route actually runs its timetable, 0..1.
    async fn regularity(&self, route_id: &str) -> Result<f64, ProviderError>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Weather-induced disruption risk along the listed cities, 0..1.
    async fn route_weather_risk(
        &self,
        cities: &[String],
        date: Option<NaiveDate>,
    ) -> Result<f64, ProviderError>;
}

#[async_trait]
pub trait SeasonalityProvider: Send + Sync {
    async fn season_factor(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<f64, ProviderError>;
}

// - Built-in deterministic providers -

/// Fixed historical averages for networks without a telemetry backend.
pub struct StaticHistory {
    history: SegmentHistory,
}

impl Default for StaticHistory {
    fn default() -> Self {
        Self {
            history: SegmentHistory {
                avg_delay_30d_minutes: 10.0,
                avg_delay_60d_minutes: 11.0,
                avg_delay_90d_minutes: 12.0,
                delay_frequency_90d: 0.1,
                cancellation_rate_90d: 0.03,
                avg_occupancy: 0.65,
            },
        }
    }
}

impl StaticHistory {
    pub fn with(history: SegmentHistory) -> Self {
        Self { history }
    }
}

#[async_trait]
impl HistoricalDataProvider for StaticHistory {
    async fn segment_history(
        &self,
        route_id: &str,
    ) -> Result<SegmentHistory, ProviderError> {
        // synthesized routes have never run, so there is nothing to average
        if route_id.starts_with("virtual-route-") {
            return Err(ProviderError::new(
                "no telemetry for synthesized routes",
            ));
        }
        Ok(self.history.clone())
    }
}

pub struct SteadySchedule {
    regularity: f64,
}

impl Default for SteadySchedule {
    fn default() -> Self {
        Self { regularity: 0.85 }
    }
}

impl SteadySchedule {
    pub fn with(regularity: f64) -> Self {
        Self { regularity }
    }
}

#[async_trait]
impl ScheduleRegularityProvider for SteadySchedule {
    async fn regularity(&self, _route_id: &str) -> Result<f64, ProviderError> {
        Ok(self.regularity)
    }
}

pub struct CalmWeather {
    risk: f64,
}

impl Default for CalmWeather {
    fn default() -> Self {
        Self { risk: 0.2 }
    }
}

impl CalmWeather {
    pub fn with(risk: f64) -> Self {
        Self { risk }
    }
}

#[async_trait]
impl WeatherProvider for CalmWeather {
    async fn route_weather_risk(
        &self,
        _cities: &[String],
        _date: Option<NaiveDate>,
    ) -> Result<f64, ProviderError> {
        Ok(self.risk)
    }
}

/// Seasonality straight from the calendar: winter and summer peaks, an extra
/// weekend bump.
pub struct CalendarSeasonality;

#[async_trait]
impl SeasonalityProvider for CalendarSeasonality {
    async fn season_factor(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<f64, ProviderError> {
        Ok(date.map(calendar_season_factor).unwrap_or(1.0))
    }
}

pub fn calendar_season_factor(date: NaiveDate) -> f64 {
    let mut factor = 1.0;
    match date.month() {
        12 | 1 | 2 => factor *= 1.2,
        6 | 7 | 8 => factor *= 1.1,
        _ => {}
    }
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        factor *= 1.1;
    }
    factor
}
