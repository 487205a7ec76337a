use model::{
    itinerary::Itinerary,
    risk::{RiskAssessment, RiskBand, RiskFactors},
};

use crate::features::RiskFeatures;

/// Scoring model behind the risk endpoint. The bundled implementation is the
/// deterministic rule table; a learned model would implement the same trait
/// over `RiskFeatures::to_vector`.
pub trait RiskModel: Send + Sync {
    fn predict(&self, features: &RiskFeatures) -> RiskAssessment;
}

pub struct RuleBasedModel;

impl RiskModel for RuleBasedModel {
    fn predict(&self, features: &RiskFeatures) -> RiskAssessment {
        let mut risk = 1.0;
        risk += transfer_component(features.transfer_count);
        risk += transport_component(features);
        risk += delay_component(
            features.avg_delay_90d_minutes,
            features.delay_frequency_90d,
        );
        risk += cancellation_component(features.cancellation_rate_90d);
        risk += occupancy_component(
            features.avg_occupancy,
            features.high_occupancy_segments,
            features.low_availability_segments,
        );
        risk += regularity_component(features.schedule_regularity);
        risk += 1.5 * features.weather_risk;
        risk += season_component(features.season_factor);
        risk += duration_component(features.total_duration_minutes);

        let score = (risk.round() as i64).clamp(1, 10) as u8;
        let band = RiskBand::from_score(score);

        RiskAssessment {
            score,
            band,
            description: band.description().to_owned(),
            factors: factors_of(features),
            recommendations: recommendations(features, score),
        }
    }
}

fn transfer_component(transfers: usize) -> f64 {
    match transfers {
        0 => 0.0,
        1 => 0.5,
        2 => 1.0,
        n => 1.5 + 0.5 * (n as f64 - 2.0),
    }
}

fn transport_component(features: &RiskFeatures) -> f64 {
    let mut component = 0.0;
    if features.has_ferry || features.has_river_transport {
        component += 1.5;
    }
    if features.has_mixed_transport {
        component += 0.5;
    }
    if features.has_bus {
        component += 0.3;
    }
    component
}

fn delay_component(avg_delay_90d: f64, delay_frequency: f64) -> f64 {
    let base = if avg_delay_90d < 15.0 {
        0.0
    } else if avg_delay_90d < 30.0 {
        0.5
    } else if avg_delay_90d < 60.0 {
        1.0
    } else {
        1.5 + (avg_delay_90d - 60.0) / 60.0
    };
    (base + delay_frequency * 2.0).min(2.0)
}

fn cancellation_component(rate: f64) -> f64 {
    if rate < 0.05 {
        0.0
    } else if rate < 0.10 {
        0.5
    } else if rate < 0.20 {
        1.0
    } else {
        1.5 + rate * 5.0
    }
}

fn occupancy_component(
    avg_occupancy: f64,
    high_occupancy_segments: usize,
    low_availability_segments: usize,
) -> f64 {
    let mut component = if avg_occupancy > 0.9 {
        1.0
    } else if avg_occupancy > 0.8 {
        0.5
    } else {
        0.0
    };
    component += 0.3 * high_occupancy_segments as f64;
    component += 0.5 * low_availability_segments as f64;
    component.min(2.0)
}

fn regularity_component(regularity: f64) -> f64 {
    if regularity > 0.8 {
        0.0
    } else if regularity > 0.6 {
        0.3
    } else if regularity > 0.4 {
        0.7
    } else {
        1.0
    }
}

fn season_component(season_factor: f64) -> f64 {
    if season_factor > 1.15 {
        0.5
    } else if season_factor > 1.1 {
        0.3
    } else {
        0.0
    }
}

fn duration_component(total_duration_minutes: i64) -> f64 {
    let hours = total_duration_minutes as f64 / 60.0;
    if hours < 2.0 {
        0.0
    } else if hours < 6.0 {
        0.2
    } else if hours < 12.0 {
        0.4
    } else {
        0.6 + (hours - 12.0) / 24.0
    }
}

fn factors_of(features: &RiskFeatures) -> RiskFactors {
    RiskFactors {
        transfer_count: features.transfer_count,
        segment_count: features.segment_count,
        total_duration_minutes: features.total_duration_minutes,
        avg_delay_90d_minutes: features.avg_delay_90d_minutes,
        delay_frequency_90d: features.delay_frequency_90d,
        cancellation_rate_90d: features.cancellation_rate_90d,
        avg_occupancy: features.avg_occupancy,
        high_occupancy_segments: features.high_occupancy_segments,
        low_availability_segments: features.low_availability_segments,
        schedule_regularity: features.schedule_regularity,
        weather_risk: features.weather_risk,
        season_factor: features.season_factor,
        has_ferry: features.has_ferry,
        has_river_transport: features.has_river_transport,
        has_mixed_transport: features.has_mixed_transport,
    }
}

fn recommendations(features: &RiskFeatures, score: u8) -> Vec<String> {
    let mut hints = Vec::new();
    if score >= 7 {
        hints.push(
            "Consider purchasing travel insurance for this trip.".to_owned(),
        );
    }
    if features.transfer_count > 2 {
        hints.push(
            "Arrive at transfer points early; this itinerary chains several \
             connections."
                .to_owned(),
        );
    }
    if features.has_ferry || features.has_river_transport {
        hints.push(
            "Water segments are weather-sensitive; check conditions before \
             departure."
                .to_owned(),
        );
    }
    if features.avg_occupancy > 0.9 {
        hints.push(
            "Seats fill quickly on this connection; book as early as possible."
                .to_owned(),
        );
    }
    if features.schedule_regularity < 0.6 {
        hints.push(
            "Service on this route is irregular; verify the schedule before \
             traveling."
                .to_owned(),
        );
    }
    if features.cancellation_rate_90d > 0.1 {
        hints.push(
            "Cancellations are frequent on this route; consider alternative \
             connections."
                .to_owned(),
        );
    }
    hints
}

/// The fallback produced when signal collection fails: a medium assessment
/// that still lets the itinerary go out, with the degradation on record.
pub fn degraded_assessment(itinerary: &Itinerary) -> RiskAssessment {
    let band = RiskBand::Medium;
    RiskAssessment {
        score: 5,
        band,
        description: band.description().to_owned(),
        factors: RiskFactors {
            transfer_count: itinerary.transfer_count,
            segment_count: itinerary.segments.len(),
            total_duration_minutes: itinerary.total_duration_minutes,
            ..RiskFactors::default()
        },
        recommendations: vec![
            "Historical signals were unavailable; the assessment degraded to \
             the default medium risk."
                .to_owned(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use model::route::TransportKind;

    use super::*;

    fn quiet_features() -> RiskFeatures {
        RiskFeatures {
            transfer_count: 0,
            segment_count: 1,
            total_duration_minutes: 60,
            longest_segment_minutes: 60,
            shortest_transfer_minutes: None,
            transport_kinds: vec![TransportKind::Train],
            has_ferry: false,
            has_river_transport: false,
            has_mixed_transport: false,
            has_bus: false,
            avg_delay_90d_minutes: 5.0,
            delay_frequency_90d: 0.0,
            cancellation_rate_90d: 0.01,
            avg_occupancy: 0.5,
            high_occupancy_segments: 0,
            low_availability_segments: 0,
            schedule_regularity: 0.9,
            weather_risk: 0.0,
            season_factor: 1.0,
        }
    }

    #[test]
    fn a_quiet_itinerary_scores_at_the_floor() {
        let assessment = RuleBasedModel.predict(&quiet_features());
        assert_eq!(assessment.score, 1);
        assert_eq!(assessment.band, RiskBand::VeryLow);
        assert!(assessment.recommendations.is_empty());
    }

    #[test]
    fn transfer_component_grows_past_two_transfers() {
        assert_eq!(transfer_component(0), 0.0);
        assert_eq!(transfer_component(1), 0.5);
        assert_eq!(transfer_component(2), 1.0);
        assert_eq!(transfer_component(3), 2.0);
        assert_eq!(transfer_component(5), 3.0);
    }

    #[test]
    fn delay_component_caps_at_two() {
        assert_eq!(delay_component(5.0, 0.0), 0.0);
        assert_eq!(delay_component(20.0, 0.0), 0.5);
        assert_eq!(delay_component(45.0, 0.0), 1.0);
        assert_eq!(delay_component(120.0, 0.0), 2.0);
        assert_eq!(delay_component(10.0, 0.9), 1.8);
        assert_eq!(delay_component(45.0, 1.0), 2.0);
    }

    #[test]
    fn occupancy_component_caps_at_two() {
        assert_eq!(occupancy_component(0.95, 0, 0), 1.0);
        assert_eq!(occupancy_component(0.85, 0, 0), 0.5);
        assert_eq!(occupancy_component(0.5, 1, 1), 0.8);
        assert_eq!(occupancy_component(0.95, 3, 3), 2.0);
    }

    #[test]
    fn the_score_never_leaves_its_bounds() {
        let mut worst = quiet_features();
        worst.transfer_count = 8;
        worst.has_ferry = true;
        worst.has_river_transport = true;
        worst.has_mixed_transport = true;
        worst.has_bus = true;
        worst.avg_delay_90d_minutes = 500.0;
        worst.delay_frequency_90d = 1.0;
        worst.cancellation_rate_90d = 0.6;
        worst.avg_occupancy = 0.99;
        worst.high_occupancy_segments = 6;
        worst.low_availability_segments = 6;
        worst.schedule_regularity = 0.1;
        worst.weather_risk = 1.0;
        worst.season_factor = 1.32;
        worst.total_duration_minutes = 60 * 60;

        let assessment = RuleBasedModel.predict(&worst);
        assert_eq!(assessment.score, 10);
        assert_eq!(assessment.band, RiskBand::VeryHigh);
    }

    #[test]
    fn risky_features_trigger_the_documented_recommendations() {
        let mut features = quiet_features();
        features.transfer_count = 3;
        features.has_ferry = true;
        features.avg_occupancy = 0.95;
        features.schedule_regularity = 0.5;
        features.cancellation_rate_90d = 0.15;

        let assessment = RuleBasedModel.predict(&features);
        // the five feature-driven hints plus the insurance hint at score 7
        assert_eq!(assessment.score, 7);
        assert_eq!(assessment.recommendations.len(), 6);
    }
}
