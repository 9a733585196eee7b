use serde::{Deserialize, Serialize};

/// Place the provider resolved the query to.
///
/// Coordinates stay strings because the provider sends them that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherLocation {
    pub name: String,
    pub country: String,
    pub region: String,
    pub lat: String,
    pub lon: String,
    pub timezone_id: String,
    #[serde(default)]
    pub localtime: Option<String>,
    #[serde(default)]
    pub localtime_epoch: Option<i64>,
    #[serde(default)]
    pub utc_offset: Option<String>,
}

/// Current conditions, in whatever unit system the request asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub observation_time: String,
    pub temperature: i32,
    pub weather_code: i32,
    pub weather_icons: Vec<String>,
    pub weather_descriptions: Vec<String>,
    pub wind_speed: i32,
    pub wind_degree: i32,
    pub wind_dir: String,
    pub pressure: i32,
    pub precip: f64,
    pub humidity: i32,
    pub cloudcover: i32,
    pub feelslike: i32,
    pub uv_index: i32,
    pub visibility: i32,
    pub is_day: String,
}

impl WeatherCondition {
    pub fn primary_description(&self) -> &str {
        self.weather_descriptions.first().map(String::as_str).unwrap_or("Unknown")
    }

    pub fn is_daytime(&self) -> bool {
        self.is_day.eq_ignore_ascii_case("yes")
    }
}

/// Unit cached by the client and handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub location: WeatherLocation,
    pub current: WeatherCondition,
}
