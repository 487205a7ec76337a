use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::Location;

/// A physical or synthesized boarding point.
///
/// The `city` field always holds the canonical city key produced by the
/// normalizer; raw upstream labels never reach this type. Virtual stops carry
/// an identifier derived from that key, so the same city yields the same
/// virtual stop across datasets and restarts.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: Id<Stop>,
    pub name: String,
    pub location: Option<Location>,
    pub city: String,
    pub kind: StopKind,
    pub is_virtual: bool,
}

impl HasId for Stop {
    type IdType = String;
}

impl Stop {
    pub fn latitude(&self) -> Option<f64> {
        self.location.map(|location| location.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.location.map(|location| location.longitude)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    Airport,
    Railway,
    FerryTerminal,
    Generic,
}

impl Default for StopKind {
    fn default() -> Self {
        Self::Generic
    }
}
