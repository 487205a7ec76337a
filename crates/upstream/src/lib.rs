//! Boundary to the upstream transport-data provider. Shapes are normalized
//! here; nothing downstream ever sees provider-native field names.

use std::{env, error, fmt, result, time::Duration};

use async_trait::async_trait;
use model::dataset::SourceMode;
use serde::{Deserialize, Serialize};

pub mod mock;
pub mod odata;

pub use mock::MockProvider;
pub use odata::ODataClient;

/// Upstream failure, classified at the boundary. The retryable subset
/// ({408, 429, 500, 502, 503, 504} and transport timeouts) is retried with
/// exponential backoff before surfacing as `RetryExhausted`.
#[derive(Debug)]
pub enum UpstreamError {
    Unavailable(String),
    Timeout,
    Authentication,
    NotFound,
    Server { status: u16 },
    RetryExhausted { attempts: u32 },
    Decode(serde_json::Error),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Unavailable(why) => {
                write!(f, "upstream unavailable: {why}")
            }
            UpstreamError::Timeout => write!(f, "upstream request timed out"),
            UpstreamError::Authentication => {
                write!(f, "upstream rejected the credentials")
            }
            UpstreamError::NotFound => write!(f, "upstream entity not found"),
            UpstreamError::Server { status } => {
                write!(f, "upstream returned status {status}")
            }
            UpstreamError::RetryExhausted { attempts } => {
                write!(f, "upstream still failing after {attempts} attempts")
            }
            UpstreamError::Decode(why) => {
                write!(f, "upstream response did not decode: {why}")
            }
        }
    }
}

impl error::Error for UpstreamError {}

impl From<serde_json::Error> for UpstreamError {
    fn from(why: serde_json::Error) -> Self {
        UpstreamError::Decode(why)
    }
}

pub type Result<T> = result::Result<T, UpstreamError>;

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Stop record as it crosses the boundary: normalized field names, raw
/// values. City labels are canonicalized later by the ingestion worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStop {
    pub external_id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: String,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoute {
    pub external_id: String,
    pub stop_external_ids: Vec<String>,
    pub kind: Option<String>,
    pub number: Option<String>,
    pub operator: Option<String>,
    pub base_fare: Option<f64>,
}

/// Trip record with departure/arrival still textual: either wall-clock
/// `HH:MM` on the snapshot date or a full ISO timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFlight {
    pub external_id: String,
    pub route_external_id: String,
    pub from_stop_external_id: String,
    pub to_stop_external_id: String,
    pub departure: String,
    pub arrival: String,
    pub price: Option<f64>,
    pub seats_available: Option<u32>,
    pub status: Option<String>,
}

/// Full upstream snapshot. `canonical_json` gives the byte-stable rendering
/// the ingestion worker hashes for change detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamSnapshot {
    pub stops: Vec<RawStop>,
    pub routes: Vec<RawRoute>,
    pub flights: Vec<RawFlight>,
}

impl UpstreamSnapshot {
    /// Deterministic JSON: records sorted by external id, struct field order
    /// fixed by declaration. Equal snapshots render to equal bytes no matter
    /// how the provider ordered them.
    pub fn canonical_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut ordered = self.clone();
        ordered.stops.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        ordered
            .routes
            .sort_by(|a, b| a.external_id.cmp(&b.external_id));
        ordered
            .flights
            .sort_by(|a, b| a.external_id.cmp(&b.external_id));
        serde_json::to_vec(&ordered)
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty() && self.routes.is_empty() && self.flights.is_empty()
    }
}

/// Realtime price/seat lookup result for one flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightQuote {
    pub price: Option<f64>,
    pub seats_available: Option<u32>,
}

/// The upstream data source. `fetch_all` returns a full snapshot;
/// `flight_quote` serves the realtime per-flight lookups.
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    fn mode(&self) -> SourceMode;
    async fn fetch_all(&self) -> Result<UpstreamSnapshot>;
    async fn flight_quote(&self, external_id: &str)
        -> Result<Option<FlightQuote>>;
}

/// Provider tuning read from the environment.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub enable_cache: bool,
    pub cache_ttl: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            enable_cache: true,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("ODATA_BASE_URL").ok(),
            username: env::var("ODATA_USERNAME").ok(),
            password: env::var("ODATA_PASSWORD").ok(),
            timeout: env_secs("ODATA_TIMEOUT").unwrap_or(defaults.timeout),
            retry_attempts: env_parse("ODATA_RETRY_ATTEMPTS")
                .unwrap_or(defaults.retry_attempts),
            retry_delay: env_millis("ODATA_RETRY_DELAY")
                .unwrap_or(defaults.retry_delay),
            enable_cache: env_parse("ODATA_ENABLE_CACHE")
                .unwrap_or(defaults.enable_cache),
            cache_ttl: env_secs("ODATA_CACHE_TTL")
                .unwrap_or(defaults.cache_ttl),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok()?.parse().ok()
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parse(name).map(Duration::from_secs)
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse(name).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_ignores_record_order() {
        let stop = |id: &str| RawStop {
            external_id: id.to_owned(),
            name: format!("stop {id}"),
            latitude: None,
            longitude: None,
            city: "Якутск".to_owned(),
            kind: None,
        };
        let a = UpstreamSnapshot {
            stops: vec![stop("1"), stop("2")],
            ..Default::default()
        };
        let b = UpstreamSnapshot {
            stops: vec![stop("2"), stop("1")],
            ..Default::default()
        };
        assert_eq!(a.canonical_json().unwrap(), b.canonical_json().unwrap());
    }

    #[test]
    fn retryable_statuses_match_the_contract() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status));
        }
        for status in [200, 400, 401, 403, 404] {
            assert!(!is_retryable_status(status));
        }
    }
}
