use std::time::Duration;

use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};
use weather_core::NotificationDispatcher;

/// Check for due subscriptions every `period` until the task is dropped.
pub async fn run(dispatcher: NotificationDispatcher, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        match dispatcher.dispatch_due(Utc::now()).await {
            Ok(report) if report.sent.is_empty() && report.failed.is_empty() => {}
            Ok(report) => info!(
                sent = report.sent.len(),
                failed = report.failed.len(),
                "Scheduled notification run finished"
            ),
            Err(err) => error!(error = %format!("{err:#}"), "Could not load subscriptions"),
        }
    }
}
