//! HTTP surface: current weather and provider health.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use weather_core::{ValidationError, WeatherError, WeatherProvider, WeatherRequest, WeatherResponse};

#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<dyn WeatherProvider>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/weather/current", get(current_weather))
        .route("/weather/health", get(health))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

/// Errors surfaced to HTTP callers.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Weather(WeatherError),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        ApiError::Weather(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "Validation error", "message": err.to_string() })),
            )
                .into_response(),
            ApiError::Weather(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Weather service error",
                    "message": err.to_string(),
                    "kind": err.kind(),
                    "context": err.context(),
                })),
            )
                .into_response(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CurrentQuery {
    pub location: Option<String>,
    pub units: Option<String>,
    pub language: Option<String>,
}

async fn current_weather(
    State(state): State<AppState>,
    Query(query): Query<CurrentQuery>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let request = WeatherRequest::build(
        query.location.unwrap_or_default(),
        query.units.as_deref(),
        query.language.as_deref(),
    )?;

    let weather = state.weather.get_weather(&request).await?;
    Ok(Json(weather))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if state.weather.is_available().await {
        (StatusCode::OK, Json(HealthResponse { status: "available".to_string() }))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse { status: "unavailable".to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Debug)]
    struct StaticProvider {
        result: Result<WeatherResponse, WeatherError>,
        available: bool,
    }

    #[async_trait]
    impl WeatherProvider for StaticProvider {
        async fn get_weather(
            &self,
            _request: &WeatherRequest,
        ) -> Result<WeatherResponse, WeatherError> {
            self.result.clone()
        }

        async fn is_available(&self) -> bool {
            self.available
        }
    }

    fn sample_weather() -> WeatherResponse {
        serde_json::from_value(json!({
            "location": {
                "name": "London", "country": "United Kingdom", "region": "City of London",
                "lat": "51.517", "lon": "-0.106", "timezone_id": "Europe/London"
            },
            "current": {
                "observation_time": "10:45 AM", "temperature": 15, "weather_code": 116,
                "weather_icons": [], "weather_descriptions": ["Partly cloudy"],
                "wind_speed": 10, "wind_degree": 220, "wind_dir": "NE", "pressure": 1015,
                "precip": 0, "humidity": 75, "cloudcover": 25, "feelslike": 14,
                "uv_index": 4, "visibility": 10, "is_day": "yes"
            }
        }))
        .unwrap()
    }

    fn app(result: Result<WeatherResponse, WeatherError>, available: bool) -> Router {
        router(AppState { weather: Arc::new(StaticProvider { result, available }) })
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn current_returns_location_and_conditions() {
        let (status, body) =
            get(app(Ok(sample_weather()), true), "/weather/current?location=London").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["name"], "London");
        assert_eq!(body["current"]["temperature"], 15);
    }

    #[tokio::test]
    async fn missing_location_is_422() {
        let (status, body) = get(app(Ok(sample_weather()), true), "/weather/current").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Validation error");
        assert_eq!(body["message"], "Location cannot be empty");
    }

    #[tokio::test]
    async fn unknown_units_are_422() {
        let (status, body) =
            get(app(Ok(sample_weather()), true), "/weather/current?location=London&units=k").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid units"));
    }

    #[tokio::test]
    async fn weather_failure_is_500_with_context() {
        let failure = WeatherError::ApiError {
            location: "Atlantis".into(),
            error: json!({ "code": 615, "info": "Location not found" }),
        };

        let (status, body) = get(app(Err(failure), true), "/weather/current?location=Atlantis").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Weather service error");
        assert_eq!(body["message"], "WeatherStack API error for location: Atlantis");
        assert_eq!(body["kind"], "api_error");
        assert_eq!(body["context"]["location"], "Atlantis");
        assert_eq!(body["context"]["error"]["code"], 615);
    }

    #[tokio::test]
    async fn health_reports_available() {
        let (status, body) = get(app(Ok(sample_weather()), true), "/weather/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "available");
    }

    #[tokio::test]
    async fn health_reports_unavailable() {
        let (status, body) = get(app(Ok(sample_weather()), false), "/weather/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unavailable");
    }
}
