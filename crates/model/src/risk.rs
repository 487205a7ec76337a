use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Risk score band. The score itself is always 1..=10.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=2 => RiskBand::VeryLow,
            3..=4 => RiskBand::Low,
            5..=6 => RiskBand::Medium,
            7..=8 => RiskBand::High,
            _ => RiskBand::VeryHigh,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskBand::VeryLow => "very low risk, stable connection",
            RiskBand::Low => "low risk",
            RiskBand::Medium => "medium risk, minor disruptions possible",
            RiskBand::High => "high risk, disruptions likely",
            RiskBand::VeryHigh => "very high risk, expect disruptions",
        }
    }
}

/// The factors that went into an assessment, echoed back so callers can see
/// what drove the score.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    pub transfer_count: usize,
    pub segment_count: usize,
    pub total_duration_minutes: i64,
    pub avg_delay_90d_minutes: f64,
    pub delay_frequency_90d: f64,
    pub cancellation_rate_90d: f64,
    pub avg_occupancy: f64,
    pub high_occupancy_segments: usize,
    pub low_availability_segments: usize,
    pub schedule_regularity: f64,
    pub weather_risk: f64,
    pub season_factor: f64,
    pub has_ferry: bool,
    pub has_river_transport: bool,
    pub has_mixed_transport: bool,
}

/// Deterministic rule-based assessment of one itinerary.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub score: u8,
    pub band: RiskBand,
    pub description: String,
    pub factors: RiskFactors,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_follow_the_documented_table() {
        assert_eq!(RiskBand::from_score(1), RiskBand::VeryLow);
        assert_eq!(RiskBand::from_score(2), RiskBand::VeryLow);
        assert_eq!(RiskBand::from_score(3), RiskBand::Low);
        assert_eq!(RiskBand::from_score(4), RiskBand::Low);
        assert_eq!(RiskBand::from_score(5), RiskBand::Medium);
        assert_eq!(RiskBand::from_score(6), RiskBand::Medium);
        assert_eq!(RiskBand::from_score(7), RiskBand::High);
        assert_eq!(RiskBand::from_score(8), RiskBand::High);
        assert_eq!(RiskBand::from_score(9), RiskBand::VeryHigh);
        assert_eq!(RiskBand::from_score(10), RiskBand::VeryHigh);
    }
}
