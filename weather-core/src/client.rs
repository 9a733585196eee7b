//! Cached, retrying weather client.

use std::{error::Error, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::{
    WeatherError, WeatherRequest, WeatherResponse,
    cache::WeatherCache,
    error::TransportError,
    provider::{
        WeatherProvider,
        weatherstack::{AttemptError, DEFAULT_BASE_URL, WeatherStackApi},
    },
    request::ValidationError,
    retry::RetryPolicy,
};

/// Everything the client needs, already resolved to concrete values.
#[derive(Clone)]
pub struct WeatherClientConfig {
    pub api_key: String,
    pub base_url: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub cache_ttl: Duration,
    /// Location used by the availability probe.
    pub probe_location: String,
    pub probe_timeout: Duration,
}

impl Default for WeatherClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            cache_ttl: Duration::from_secs(30),
            probe_location: "London".to_string(),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl fmt::Debug for WeatherClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("cache_ttl", &self.cache_ttl)
            .field("probe_location", &self.probe_location)
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    api: WeatherStackApi,
    cache: WeatherCache,
    retry: RetryPolicy,
    timeout: Duration,
    probe_request: WeatherRequest,
    probe_timeout: Duration,
}

impl WeatherClient {
    /// Fails only if the configured probe location is not a valid request.
    pub fn new(config: WeatherClientConfig) -> Result<Self, ValidationError> {
        let probe_request = WeatherRequest::for_location(config.probe_location)?;

        Ok(Self {
            api: WeatherStackApi::new(config.base_url, config.api_key),
            cache: WeatherCache::new(config.cache_ttl),
            retry: config.retry,
            timeout: config.timeout,
            probe_request,
            probe_timeout: config.probe_timeout,
        })
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    /// Longest a single `fetch` can take against a degraded upstream.
    pub fn worst_case_latency(&self) -> Duration {
        self.retry.worst_case(self.timeout)
    }

    /// Current conditions for `request`, served from cache when fresh.
    ///
    /// Concurrent calls for the same key share one upstream fetch. Failures are logged
    /// and returned, never cached.
    #[instrument(skip(self, request), fields(location = request.location()))]
    pub async fn fetch(&self, request: &WeatherRequest) -> Result<WeatherResponse, WeatherError> {
        let result = self
            .cache
            .get_or_try_load(request, self.fetch_with_retry(request))
            .await
            .map_err(Arc::unwrap_or_clone);

        if let Err(err) = &result {
            error!(
                location = request.location(),
                kind = err.kind(),
                message = %err,
                cause = %cause_chain(err),
                "Weather service error"
            );
        }

        result
    }

    async fn fetch_with_retry(
        &self,
        request: &WeatherRequest,
    ) -> Result<WeatherResponse, WeatherError> {
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let fault = match self.api.current(request, self.timeout).await {
                Ok(response) => {
                    info!(
                        location = request.location(),
                        temperature = response.current.temperature,
                        condition = response.current.primary_description(),
                        attempts,
                        "Weather data retrieved"
                    );
                    return Ok(response);
                }
                Err(AttemptError::Terminal(err)) => return Err(err),
                Err(AttemptError::Retryable(fault)) => fault,
            };

            if !self.retry.should_retry(attempts) {
                warn!(location = request.location(), attempts, error = %fault, "Retries exhausted");
                return Err(exhausted(request.location(), fault));
            }

            warn!(
                location = request.location(),
                attempt = attempts,
                delay = ?self.retry.delay,
                error = %fault,
                "Weather request failed, waiting before retry"
            );
            tokio::time::sleep(self.retry.delay).await;
        }
    }

    /// Single uncached attempt against a reference location.
    #[instrument(skip(self))]
    pub async fn is_available(&self) -> bool {
        match self.api.probe(&self.probe_request, self.probe_timeout).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(location = self.probe_request.location(), "Health check rejected by provider");
                false
            }
            Err(err) => {
                error!(message = %err, cause = %cause_chain(&err), "Health check failed");
                false
            }
        }
    }
}

/// The error a caller sees once the retry budget is spent on `last`.
fn exhausted(location: &str, last: TransportError) -> WeatherError {
    match last {
        TransportError::Status(status) => {
            WeatherError::InvalidResponse { location: location.to_owned(), status }
        }
        other => WeatherError::upstream(location, other),
    }
}

fn cause_chain(err: &dyn Error) -> String {
    let mut chain = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain.join(": ")
}

#[async_trait]
impl WeatherProvider for WeatherClient {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherResponse, WeatherError> {
        self.fetch(request).await
    }

    async fn is_available(&self) -> bool {
        WeatherClient::is_available(self).await
    }
}
