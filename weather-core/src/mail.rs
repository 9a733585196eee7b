use async_trait::async_trait;
use reqwest::Url;

use crate::WeatherResponse;

/// Rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherEmail {
    pub subject: String,
    pub body: String,
}

impl WeatherEmail {
    /// Daily update for a subscriber. Temperatures assume metric units.
    pub fn weather_update(weather: &WeatherResponse, app_url: &str) -> Self {
        let location = &weather.location;
        let current = &weather.current;

        let mut lines = vec![
            "Hello!".to_string(),
            String::new(),
            format!(
                "Here's your daily weather update for {}, {}:",
                location.name, location.country
            ),
            format!("Temperature: {}°C", current.temperature),
            format!("Condition: {}", current.primary_description()),
            format!("Wind: {} km/h {}", current.wind_speed, current.wind_dir),
            format!("Humidity: {}%", current.humidity),
            format!("Feels Like: {}°C", current.feelslike),
        ];

        if let Some(link) = forecast_link(app_url, &location.name) {
            lines.push(String::new());
            lines.push(format!("View Full Forecast: {link}"));
        }

        lines.push(String::new());
        lines.push("Thank you for using our weather service!".to_string());

        Self { subject: format!("Weather Update for {}", location.name), body: lines.join("\n") }
    }
}

fn forecast_link(app_url: &str, location: &str) -> Option<Url> {
    let mut url = Url::parse(app_url).ok()?.join("weather").ok()?;
    url.query_pairs_mut().append_pair("location", location);
    Some(url)
}

/// Outbound mail collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, email: &WeatherEmail) -> anyhow::Result<()>;
}
