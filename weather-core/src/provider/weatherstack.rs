use std::{fmt, time::Duration};

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{TransportError, WeatherError},
    model::WeatherResponse,
    request::WeatherRequest,
};

pub const DEFAULT_BASE_URL: &str = "http://api.weatherstack.com";

/// Outcome of one failed HTTP attempt, split by whether another attempt may help.
#[derive(Debug)]
pub(crate) enum AttemptError {
    Retryable(TransportError),
    Terminal(WeatherError),
}

/// Thin client for the WeatherStack `current` endpoint.
///
/// Performs exactly one HTTP call per method invocation; retrying and caching are
/// the caller's business.
#[derive(Clone)]
pub struct WeatherStackApi {
    http: Client,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for WeatherStackApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherStackApi")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl WeatherStackApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { http: Client::new(), base_url: base_url.into(), api_key: api_key.into() }
    }

    fn current_url(&self) -> String {
        format!("{}/current", self.base_url.trim_end_matches('/'))
    }

    async fn get_current(
        &self,
        request: &WeatherRequest,
        timeout: Duration,
    ) -> Result<(StatusCode, String), TransportError> {
        let mut query = vec![
            ("access_key", self.api_key.as_str()),
            ("query", request.location()),
            ("units", request.units().code()),
        ];
        if !request.language().is_default() {
            query.push(("language", request.language().code()));
        }

        let res = self.http.get(self.current_url()).query(&query).timeout(timeout).send().await?;

        let status = res.status();
        let body = res.text().await?;

        debug!(location = request.location(), %status, bytes = body.len(), "WeatherStack replied");

        Ok((status, body))
    }

    /// One attempt at fetching current conditions, classified.
    pub(crate) async fn current(
        &self,
        request: &WeatherRequest,
        timeout: Duration,
    ) -> Result<WeatherResponse, AttemptError> {
        let (status, body) =
            self.get_current(request, timeout).await.map_err(AttemptError::Retryable)?;

        classify(request.location(), status, &body)
    }

    /// Single liveness call: transport success and no `error` key in the payload.
    pub(crate) async fn probe(
        &self,
        request: &WeatherRequest,
        timeout: Duration,
    ) -> Result<bool, TransportError> {
        let (status, body) = self.get_current(request, timeout).await?;
        if !status.is_success() {
            return Ok(false);
        }

        let payload: Value = serde_json::from_str(&body)?;
        Ok(error_payload(&payload).is_none())
    }
}

fn error_payload(payload: &Value) -> Option<&Value> {
    payload.get("error").filter(|e| !e.is_null())
}

/// Map a raw provider reply onto a response or a failure kind.
///
/// Checks run in a fixed order: HTTP status, provider error object, missing sections,
/// and only then the typed parse.
pub(crate) fn classify(
    location: &str,
    status: StatusCode,
    body: &str,
) -> Result<WeatherResponse, AttemptError> {
    let payload = serde_json::from_str::<Value>(body);

    if !status.is_success() {
        // A provider error object is terminal even on a failed status.
        return match payload {
            Ok(ref p) if error_payload(p).is_some() => {
                Err(AttemptError::Terminal(WeatherError::InvalidResponse {
                    location: location.to_owned(),
                    status: status.as_u16(),
                }))
            }
            _ => Err(AttemptError::Retryable(TransportError::Status(status.as_u16()))),
        };
    }

    let payload = payload.map_err(|e| AttemptError::Retryable(e.into()))?;

    if let Some(error) = error_payload(&payload) {
        return Err(AttemptError::Terminal(WeatherError::ApiError {
            location: location.to_owned(),
            error: error.clone(),
        }));
    }

    if ["current", "location"].into_iter().any(|key| payload.get(key).is_none_or(Value::is_null)) {
        return Err(AttemptError::Terminal(WeatherError::DataNotAvailable {
            location: location.to_owned(),
        }));
    }

    serde_json::from_value(payload)
        .map_err(|e| AttemptError::Terminal(WeatherError::upstream(location, e.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;
    use serde_json::json;

    fn body(value: Value) -> String {
        value.to_string()
    }

    #[test]
    fn success_payload_parses() {
        let wire = body(serde_json::to_value(fixtures::london()).unwrap());

        let parsed = classify("London", StatusCode::OK, &wire).expect("should parse");
        assert_eq!(parsed, fixtures::london());
    }

    #[test]
    fn error_object_is_api_error() {
        let wire = body(json!({
            "success": false,
            "error": { "code": 615, "type": "request_failed", "info": "Location not found" }
        }));

        match classify("Nowhere", StatusCode::OK, &wire) {
            Err(AttemptError::Terminal(WeatherError::ApiError { location, error })) => {
                assert_eq!(location, "Nowhere");
                assert_eq!(error["code"], 615);
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn null_error_is_not_an_error() {
        let mut wire = serde_json::to_value(fixtures::london()).unwrap();
        wire["error"] = Value::Null;

        assert!(classify("London", StatusCode::OK, &body(wire)).is_ok());
    }

    #[test]
    fn missing_sections_are_data_not_available() {
        let full = serde_json::to_value(fixtures::london()).unwrap();

        for missing in ["current", "location"] {
            let mut wire = full.clone();
            wire.as_object_mut().unwrap().remove(missing);

            assert!(
                matches!(
                    classify("London", StatusCode::OK, &body(wire)),
                    Err(AttemptError::Terminal(WeatherError::DataNotAvailable { .. }))
                ),
                "missing {missing}"
            );
        }

        assert!(matches!(
            classify("London", StatusCode::OK, &body(json!({ "some": "invalid data" }))),
            Err(AttemptError::Terminal(WeatherError::DataNotAvailable { .. }))
        ));
    }

    #[test]
    fn null_sections_are_data_not_available() {
        let full = serde_json::to_value(fixtures::london()).unwrap();

        for missing in ["current", "location"] {
            let mut wire = full.clone();
            wire[missing] = Value::Null;

            assert!(
                matches!(
                    classify("London", StatusCode::OK, &body(wire)),
                    Err(AttemptError::Terminal(WeatherError::DataNotAvailable { .. }))
                ),
                "null {missing}"
            );
        }
    }

    #[test]
    fn failed_status_without_error_object_is_retryable() {
        for wire in ["Internal Server Error", "", "{\"message\":\"busy\"}"] {
            assert!(matches!(
                classify("London", StatusCode::BAD_GATEWAY, wire),
                Err(AttemptError::Retryable(TransportError::Status(502)))
            ));
        }
    }

    #[test]
    fn failed_status_with_error_object_is_terminal() {
        let wire = body(json!({ "error": { "code": 101, "type": "invalid_access_key" } }));

        assert!(matches!(
            classify("London", StatusCode::UNAUTHORIZED, &wire),
            Err(AttemptError::Terminal(WeatherError::InvalidResponse { status: 401, .. }))
        ));
    }

    #[test]
    fn garbage_body_is_retryable() {
        assert!(matches!(
            classify("London", StatusCode::OK, "<html>gateway</html>"),
            Err(AttemptError::Retryable(TransportError::Decode(_)))
        ));
    }

    #[test]
    fn mistyped_sections_are_upstream_unavailable() {
        let mut wire = serde_json::to_value(fixtures::london()).unwrap();
        wire["current"]["temperature"] = json!("warm");

        assert!(matches!(
            classify("London", StatusCode::OK, &body(wire)),
            Err(AttemptError::Terminal(WeatherError::UpstreamUnavailable { .. }))
        ));
    }

    #[test]
    fn current_url_tolerates_trailing_slash() {
        let api = WeatherStackApi::new("http://localhost:1234/", "KEY");
        assert_eq!(api.current_url(), "http://localhost:1234/current");
    }

    #[test]
    fn debug_hides_api_key() {
        let api = WeatherStackApi::new(DEFAULT_BASE_URL, "SECRET");
        assert!(!format!("{api:?}").contains("SECRET"));
    }
}
