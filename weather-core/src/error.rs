use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;

/// A single attempt that never produced a usable provider payload.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("request failed")]
    Request(#[source] reqwest::Error),

    #[error("upstream answered with HTTP {0}")]
    Status(u16),

    #[error("response body is not valid weather JSON")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err)
        } else {
            TransportError::Request(err)
        }
    }
}

/// Every way a weather fetch can fail once the request itself is valid.
///
/// Cloning is cheap: causes are shared, so one failed fetch can be handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum WeatherError {
    #[error("Invalid API response for location: {location}")]
    InvalidResponse { location: String, status: u16 },

    #[error("WeatherStack API error for location: {location}")]
    ApiError { location: String, error: Value },

    #[error("Weather data not available for location: {location}")]
    DataNotAvailable { location: String },

    #[error("Failed to fetch weather data for location: {location}")]
    UpstreamUnavailable {
        location: String,
        #[source]
        cause: Arc<TransportError>,
    },
}

impl WeatherError {
    pub(crate) fn upstream(location: &str, cause: TransportError) -> Self {
        WeatherError::UpstreamUnavailable { location: location.to_owned(), cause: Arc::new(cause) }
    }

    pub fn location(&self) -> &str {
        match self {
            WeatherError::InvalidResponse { location, .. }
            | WeatherError::ApiError { location, .. }
            | WeatherError::DataNotAvailable { location }
            | WeatherError::UpstreamUnavailable { location, .. } => location,
        }
    }

    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WeatherError::InvalidResponse { .. } => "invalid_response",
            WeatherError::ApiError { .. } => "api_error",
            WeatherError::DataNotAvailable { .. } => "data_not_available",
            WeatherError::UpstreamUnavailable { .. } => "upstream_unavailable",
        }
    }

    /// Structured context suitable for an error response body.
    pub fn context(&self) -> Value {
        match self {
            WeatherError::InvalidResponse { location, status } => {
                json!({ "location": location, "status": status })
            }
            WeatherError::ApiError { location, error } => {
                json!({ "location": location, "error": error })
            }
            WeatherError::DataNotAvailable { location } => json!({ "location": location }),
            WeatherError::UpstreamUnavailable { location, cause } => {
                json!({ "location": location, "cause": cause.to_string() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_name_the_location() {
        let err = WeatherError::DataNotAvailable { location: "Atlantis".into() };
        assert_eq!(err.to_string(), "Weather data not available for location: Atlantis");
        assert_eq!(err.location(), "Atlantis");
        assert_eq!(err.kind(), "data_not_available");
    }

    #[test]
    fn api_error_context_carries_payload() {
        let err = WeatherError::ApiError {
            location: "Nowhere".into(),
            error: json!({ "code": 615, "type": "request_failed" }),
        };

        let ctx = err.context();
        assert_eq!(ctx["location"], "Nowhere");
        assert_eq!(ctx["error"]["code"], 615);
    }

    #[test]
    fn upstream_unavailable_keeps_cause() {
        let err = WeatherError::upstream("Paris", TransportError::Status(502));

        let source = err.source().expect("cause must be attached");
        assert_eq!(source.to_string(), "upstream answered with HTTP 502");
        assert_eq!(err.context()["cause"], "upstream answered with HTTP 502");
    }

    #[test]
    fn clones_share_the_cause() {
        let err = WeatherError::upstream("Paris", TransportError::Status(503));
        let copy = err.clone();

        match (&err, &copy) {
            (
                WeatherError::UpstreamUnavailable { cause: a, .. },
                WeatherError::UpstreamUnavailable { cause: b, .. },
            ) => assert!(Arc::ptr_eq(a, b)),
            _ => unreachable!(),
        }
    }
}
