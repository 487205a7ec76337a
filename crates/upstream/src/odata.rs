use std::{collections::HashMap, time::Instant};

use async_trait::async_trait;
use model::dataset::SourceMode;
use serde::{de::DeserializeOwned, Deserialize};
use tokio::sync::RwLock;

use crate::{
    is_retryable_status, FlightQuote, RawFlight, RawRoute, RawStop, Result,
    UpstreamConfig, UpstreamError, UpstreamProvider, UpstreamSnapshot,
};

/// OData-style HTTP provider. Every request carries the configured timeout
/// and basic-auth credentials; retryable failures back off exponentially
/// starting from `retry_delay`.
pub struct ODataClient {
    base_url: String,
    config: UpstreamConfig,
    http: reqwest::Client,
    quote_cache: RwLock<HashMap<String, (FlightQuote, Instant)>>,
}

/// OData collection envelope.
#[derive(Debug, Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

impl ODataClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| {
                UpstreamError::Unavailable("ODATA_BASE_URL is not set".to_owned())
            })?
            .trim_end_matches('/')
            .to_owned();
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|why| UpstreamError::Unavailable(why.to_string()))?;
        Ok(Self {
            base_url,
            config,
            http,
            quote_cache: RwLock::new(HashMap::new()),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);
        let attempts = self.config.retry_attempts.max(1);
        let mut delay = self.config.retry_delay;

        for attempt in 1..=attempts {
            let mut request = self.http.get(&url);
            if let Some(username) = &self.config.username {
                request =
                    request.basic_auth(username, self.config.password.as_ref());
            }

            let outcome = match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match status {
                        200..=299 => {
                            let body = response.bytes().await.map_err(|why| {
                                UpstreamError::Unavailable(why.to_string())
                            })?;
                            return serde_json::from_slice(&body)
                                .map_err(UpstreamError::from);
                        }
                        401 | 403 => Err(UpstreamError::Authentication),
                        404 => Err(UpstreamError::NotFound),
                        status if is_retryable_status(status) => {
                            Ok(status)
                        }
                        status => Err(UpstreamError::Server { status }),
                    }
                }
                Err(why) if why.is_timeout() => Ok(408),
                Err(why) if why.is_connect() => Ok(503),
                Err(why) => Err(UpstreamError::Unavailable(why.to_string())),
            };

            match outcome {
                // non-retryable: propagate as classified
                Err(error) => return Err(error),
                Ok(status) => {
                    log::warn!(
                        "upstream request to {url} failed with {status}, \
                         attempt {attempt}/{attempts}"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(UpstreamError::RetryExhausted { attempts })
    }
}

#[async_trait]
impl UpstreamProvider for ODataClient {
    fn mode(&self) -> SourceMode {
        SourceMode::Real
    }

    async fn fetch_all(&self) -> Result<UpstreamSnapshot> {
        let (stops, routes, flights) = tokio::try_join!(
            self.get_json::<Collection<RawStop>>("stops"),
            self.get_json::<Collection<RawRoute>>("routes"),
            self.get_json::<Collection<RawFlight>>("flights"),
        )?;
        Ok(UpstreamSnapshot {
            stops: stops.value,
            routes: routes.value,
            flights: flights.value,
        })
    }

    async fn flight_quote(
        &self,
        external_id: &str,
    ) -> Result<Option<FlightQuote>> {
        if self.config.enable_cache {
            let cache = self.quote_cache.read().await;
            if let Some((quote, fetched_at)) = cache.get(external_id) {
                if fetched_at.elapsed() < self.config.cache_ttl {
                    return Ok(Some(quote.clone()));
                }
            }
        }

        let quote: FlightQuote = match self
            .get_json(&format!("flights({external_id})"))
            .await
        {
            Ok(quote) => quote,
            Err(UpstreamError::NotFound) => return Ok(None),
            Err(why) => return Err(why),
        };

        if self.config.enable_cache {
            self.quote_cache.write().await.insert(
                external_id.to_owned(),
                (quote.clone(), Instant::now()),
            );
        }
        Ok(Some(quote))
    }
}
