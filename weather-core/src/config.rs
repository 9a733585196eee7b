use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, str::FromStr, time::Duration};

use crate::{
    client::WeatherClientConfig, provider::weatherstack::DEFAULT_BASE_URL, retry::RetryPolicy,
};

/// WeatherStack credentials and resilience knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Per-attempt timeout, seconds.
    pub timeout: u64,
    pub retry_attempts: u32,
    /// Pause between attempts, milliseconds.
    pub retry_delay: u64,
    /// Seconds a fetched response stays cached.
    pub cache_ttl: u64,
    pub probe_location: String,
    /// Seconds allowed for the availability probe.
    pub probe_timeout: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: 15,
            retry_attempts: 3,
            retry_delay: 1000,
            cache_ttl: 30,
            probe_location: "London".to_string(),
            probe_timeout: 5,
        }
    }
}

/// Settings for the notification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Base URL used for links inside emails.
    pub app_url: String,
    /// Subscriptions processed in parallel.
    pub concurrency: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { app_url: "http://localhost:8080".to_string(), concurrency: 4 }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [weatherstack]
/// api_key = "..."
/// timeout = 15
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub weatherstack: ProviderConfig,
    pub notifications: NotificationConfig,
}

impl Config {
    /// Load config from disk (or defaults on first run), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(cfg)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-notify", "weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay `WEATHER_API_*` variables looked up through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let ws = &mut self.weatherstack;

        if let Some(key) = lookup("WEATHER_API_KEY") {
            ws.api_key = Some(key);
        }
        if let Some(url) = lookup("WEATHER_API_BASE_URL") {
            ws.base_url = url;
        }
        override_parsed(&lookup, "WEATHER_API_TIMEOUT", &mut ws.timeout)?;
        override_parsed(&lookup, "WEATHER_API_RETRY_ATTEMPTS", &mut ws.retry_attempts)?;
        override_parsed(&lookup, "WEATHER_API_RETRY_DELAY", &mut ws.retry_delay)?;
        override_parsed(&lookup, "WEATHER_API_CACHE_TTL", &mut ws.cache_ttl)?;

        Ok(())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.weatherstack.api_key = Some(api_key);
    }

    pub fn is_configured(&self) -> bool {
        self.weatherstack.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Resolve into the client configuration, failing if no API key is known.
    pub fn client_config(&self) -> Result<WeatherClientConfig> {
        let ws = &self.weatherstack;
        let api_key = ws.api_key.clone().filter(|k| !k.is_empty()).ok_or_else(|| {
            anyhow!(
                "No WeatherStack API key configured.\n\
                 Hint: run `weather configure` or set WEATHER_API_KEY."
            )
        })?;

        if ws.timeout == 0 {
            bail!("WeatherStack timeout must be at least one second");
        }

        Ok(WeatherClientConfig {
            api_key,
            base_url: ws.base_url.clone(),
            timeout: Duration::from_secs(ws.timeout),
            retry: RetryPolicy {
                max_retries: ws.retry_attempts,
                delay: Duration::from_millis(ws.retry_delay),
            },
            cache_ttl: Duration::from_secs(ws.cache_ttl),
            probe_location: ws.probe_location.clone(),
            probe_timeout: Duration::from_secs(ws.probe_timeout),
        })
    }
}

fn override_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    target: &mut T,
) -> Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(name) {
        *target = raw.trim().parse().with_context(|| format!("Invalid value for {name}: {raw:?}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn client_config_errors_without_api_key() {
        let cfg = Config::default();
        let err = cfg.client_config().unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No WeatherStack API key configured"));
        assert!(msg.contains("Hint: run `weather configure`"));
    }

    #[test]
    fn defaults_resolve_to_documented_values() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());

        let client = cfg.client_config().expect("configured");
        assert_eq!(client.api_key, "KEY");
        assert_eq!(client.base_url, "http://api.weatherstack.com");
        assert_eq!(client.timeout, Duration::from_secs(15));
        assert_eq!(client.retry.max_retries, 3);
        assert_eq!(client.retry.delay, Duration::from_millis(1000));
        assert_eq!(client.cache_ttl, Duration::from_secs(30));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.apply_overrides(env(&[
            ("WEATHER_API_KEY", "ENV_KEY"),
            ("WEATHER_API_BASE_URL", "http://localhost:9999"),
            ("WEATHER_API_TIMEOUT", "2"),
            ("WEATHER_API_RETRY_ATTEMPTS", "0"),
            ("WEATHER_API_RETRY_DELAY", " 250 "),
            ("WEATHER_API_CACHE_TTL", "60"),
        ]))
        .expect("valid overrides");

        let client = cfg.client_config().expect("configured");
        assert_eq!(client.api_key, "ENV_KEY");
        assert_eq!(client.base_url, "http://localhost:9999");
        assert_eq!(client.timeout, Duration::from_secs(2));
        assert_eq!(client.retry.max_retries, 0);
        assert_eq!(client.retry.delay, Duration::from_millis(250));
        assert_eq!(client.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn unparseable_override_names_the_variable() {
        let mut cfg = Config::default();
        let err = cfg.apply_overrides(env(&[("WEATHER_API_TIMEOUT", "soon")])).unwrap_err();
        assert!(err.to_string().contains("WEATHER_API_TIMEOUT"));
    }

    #[test]
    fn empty_api_key_is_not_configured() {
        let mut cfg = Config::default();
        cfg.set_api_key(String::new());
        assert!(!cfg.is_configured());
        assert!(cfg.client_config().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [weatherstack]
            api_key = "FILE_KEY"
            cache_ttl = 120
            "#,
        )
        .expect("valid toml");

        assert_eq!(cfg.weatherstack.api_key.as_deref(), Some("FILE_KEY"));
        assert_eq!(cfg.weatherstack.cache_ttl, 120);
        assert_eq!(cfg.weatherstack.retry_attempts, 3);
        assert_eq!(cfg.notifications.concurrency, 4);
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());

        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let back: Config = toml::from_str(&text).expect("parse");
        assert_eq!(back, cfg);
    }
}
