use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use weather_core::{
    Config, NotificationDispatcher, WeatherClient, WeatherRequest, WeatherResponse,
};

use crate::{mailer::LogMailer, scheduler, server, store::JsonSubscriptionStore};

const SCHEDULER_PERIOD: Duration = Duration::from_secs(60);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather notification service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherStack API key in the config file.
    Configure,

    /// Show current weather for a location.
    Show {
        /// Location passed verbatim to the provider.
        location: String,

        /// m/metric, f/imperial or s/scientific.
        #[arg(long, short)]
        units: Option<String>,

        /// Two-letter language code, e.g. "de".
        #[arg(long, short)]
        language: Option<String>,
    },

    /// Check whether the weather provider answers.
    Health,

    /// Serve the HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,

        /// JSON file of subscriptions; enables the notification scheduler.
        #[arg(long)]
        subscriptions: Option<PathBuf>,
    },

    /// Send weather emails to subscribers.
    Notify {
        /// JSON file of subscriptions.
        #[arg(long)]
        subscriptions: PathBuf,

        /// Notify every active subscription, not only the ones due now.
        #[arg(long)]
        all: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { location, units, language } => {
                let client = build_client(&Config::load()?)?;
                let request =
                    WeatherRequest::build(location, units.as_deref(), language.as_deref())?;

                let weather = client.fetch(&request).await?;
                println!("{}", render(&weather));
                Ok(())
            }
            Command::Health => {
                let client = build_client(&Config::load()?)?;
                if client.is_available().await {
                    println!("available");
                    Ok(())
                } else {
                    bail!("Weather provider is unavailable");
                }
            }
            Command::Serve { addr, subscriptions } => {
                let config = Config::load()?;
                let client = build_client(&config)?;

                if let Some(path) = subscriptions {
                    let dispatcher = build_dispatcher(&config, Arc::clone(&client), path);
                    tokio::spawn(scheduler::run(dispatcher, SCHEDULER_PERIOD));
                }

                server::serve(addr, server::AppState { weather: client }).await
            }
            Command::Notify { subscriptions, all } => {
                let config = Config::load()?;
                let client = build_client(&config)?;
                let dispatcher = build_dispatcher(&config, client, subscriptions);

                let report = if all {
                    dispatcher.dispatch_all().await?
                } else {
                    dispatcher.dispatch_due(Utc::now()).await?
                };

                println!("sent: {}, failed: {}", report.sent.len(), report.failed.len());
                for failure in &report.failed {
                    println!("  subscription {}: {}", failure.subscription_id, failure.error);
                }

                if !report.is_clean() {
                    bail!("{} notification(s) failed", report.failed.len());
                }
                Ok(())
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load_file()?;

    let api_key = inquire::Password::new("WeatherStack API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

fn build_client(config: &Config) -> anyhow::Result<Arc<WeatherClient>> {
    let client = WeatherClient::new(config.client_config()?)
        .context("Invalid probe location in configuration")?;
    Ok(Arc::new(client))
}

fn build_dispatcher(
    config: &Config,
    client: Arc<WeatherClient>,
    subscriptions: PathBuf,
) -> NotificationDispatcher {
    NotificationDispatcher::new(
        client,
        Arc::new(LogMailer),
        Arc::new(JsonSubscriptionStore::new(subscriptions)),
    )
    .with_app_url(&config.notifications.app_url)
    .with_concurrency(config.notifications.concurrency)
}

/// Human-readable summary of current conditions.
fn render(weather: &WeatherResponse) -> String {
    let location = &weather.location;
    let current = &weather.current;

    let mut out = format!("{}, {} ({})\n", location.name, location.country, location.timezone_id);
    out.push_str(&format!("  Observed:    {}\n", current.observation_time));
    out.push_str(&format!("  Condition:   {}\n", current.primary_description()));
    out.push_str(&format!(
        "  Temperature: {} (feels like {})\n",
        current.temperature, current.feelslike
    ));
    out.push_str(&format!("  Wind:        {} {}\n", current.wind_speed, current.wind_dir));
    out.push_str(&format!("  Humidity:    {}%", current.humidity));
    out
}
