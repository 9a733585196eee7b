//! In-memory response cache.
//!
//! Entries expire by TTL only. Population goes through moka's coalescing
//! `try_get_with`, so concurrent misses on one key run a single loader and every
//! waiter receives its result.

use std::{future::Future, sync::Arc, time::Duration};

use moka::future::Cache;
use tracing::debug;

use crate::{WeatherRequest, WeatherResponse};

const MAX_ENTRIES: u64 = 10_000;

#[derive(Clone)]
pub struct WeatherCache {
    inner: Cache<String, WeatherResponse>,
    ttl: Duration,
}

impl std::fmt::Debug for WeatherCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherCache")
            .field("entries", &self.inner.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl WeatherCache {
    pub fn new(ttl: Duration) -> Self {
        let inner = Cache::builder().max_capacity(MAX_ENTRIES).time_to_live(ttl).build();
        Self { inner, ttl }
    }

    /// Cache key for a request: location plus the unit system and language, since both
    /// change the payload.
    pub fn key_for(request: &WeatherRequest) -> String {
        format!("weather:{}:{}:{}", request.location(), request.units(), request.language())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, request: &WeatherRequest) -> Option<WeatherResponse> {
        self.inner.get(&Self::key_for(request)).await
    }

    pub async fn insert(&self, request: &WeatherRequest, response: WeatherResponse) {
        self.inner.insert(Self::key_for(request), response).await;
    }

    /// Return the cached response or run `load` to produce it.
    ///
    /// At most one `load` runs per key at a time. A failed load is not cached and its
    /// error is shared with everyone who waited on it.
    pub async fn get_or_try_load<F, E>(
        &self,
        request: &WeatherRequest,
        load: F,
    ) -> Result<WeatherResponse, Arc<E>>
    where
        F: Future<Output = Result<WeatherResponse, E>>,
        E: Send + Sync + 'static,
    {
        let key = Self::key_for(request);
        debug!(key = %key, "weather cache lookup");
        self.inner.try_get_with(key, load).await
    }
}
