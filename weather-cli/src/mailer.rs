use async_trait::async_trait;
use tracing::info;
use weather_core::{Mailer, WeatherEmail};

/// Mailer that hands the rendered message to the log instead of an SMTP relay.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, email: &WeatherEmail) -> anyhow::Result<()> {
        info!(recipient, subject = %email.subject, body = %email.body, "Weather email ready for delivery");
        Ok(())
    }
}
