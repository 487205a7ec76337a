use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::stop::Stop;

/// An ordered run of at least two stops served by one transport kind.
///
/// Every stop id referenced here must exist in the dataset the route belongs
/// to; the graph builder refuses edges whose endpoints are missing.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Id<Route>,
    pub stop_ids: Vec<Id<Stop>>,
    pub kind: TransportKind,
    pub number: Option<String>,
    pub operator: Option<String>,
    pub base_fare: Option<f64>,
    pub is_virtual: bool,
}

impl HasId for Route {
    type IdType = String;
}

impl Route {
    /// Consecutive stop pairs in travel order, one per forward edge.
    pub fn segments(&self) -> impl Iterator<Item = (&Id<Stop>, &Id<Stop>)> {
        self.stop_ids.iter().zip(self.stop_ids.iter().skip(1))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Airplane,
    Bus,
    Train,
    Ferry,
    Taxi,
    Unknown,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportKind::Airplane => "airplane",
            TransportKind::Bus => "bus",
            TransportKind::Train => "train",
            TransportKind::Ferry => "ferry",
            TransportKind::Taxi => "taxi",
            TransportKind::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

impl TransportKind {
    /// Normalizes an upstream label. Matching is case-insensitive and accepts
    /// both english and russian spellings; anything unrecognized becomes a bus,
    /// the dominant mode of the network.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "airplane" | "plane" | "air" | "самолет" | "самолёт"
            | "авиа" | "авиарейс" => TransportKind::Airplane,
            "train" | "railway" | "поезд" | "жд"
            | "электричка" => TransportKind::Train,
            "ferry" | "ship" | "паром" | "судно" | "теплоход" => {
                TransportKind::Ferry
            }
            "taxi" | "такси" | "маршрутка" => TransportKind::Taxi,
            _ => TransportKind::Bus,
        }
    }

    pub fn is_water(&self) -> bool {
        matches!(self, TransportKind::Ferry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_normalize_case_and_language_insensitively() {
        assert_eq!(TransportKind::from_label("PLANE"), TransportKind::Airplane);
        assert_eq!(
            TransportKind::from_label("Самолёт"),
            TransportKind::Airplane
        );
        assert_eq!(TransportKind::from_label("жд"), TransportKind::Train);
        assert_eq!(TransportKind::from_label("Паром"), TransportKind::Ferry);
        assert_eq!(TransportKind::from_label("такси"), TransportKind::Taxi);
    }

    #[test]
    fn unrecognized_labels_default_to_bus() {
        assert_eq!(TransportKind::from_label("gondola"), TransportKind::Bus);
        assert_eq!(TransportKind::from_label(""), TransportKind::Bus);
    }
}
