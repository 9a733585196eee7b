use async_trait::async_trait;
use std::fmt::Debug;

use crate::{WeatherError, WeatherRequest, WeatherResponse};

pub mod weatherstack;

/// Source of current weather, as seen by the HTTP surface and the dispatcher.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherResponse, WeatherError>;

    /// Liveness only; implementations must not raise.
    async fn is_available(&self) -> bool;
}
