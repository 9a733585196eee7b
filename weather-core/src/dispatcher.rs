//! Fan-out of daily weather emails.
//!
//! Every subscription is its own failure domain: a bad location or a mail error is
//! recorded in the report and the run moves on. Retrying a fetch is the weather
//! client's job, not this module's: a scheduled subscription is attempted at most
//! once per UTC day.

use std::{collections::HashMap, fmt, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tokio::{
    sync::{Mutex, Semaphore},
    task::JoinSet,
};
use tracing::{error, info, instrument};

use crate::{
    WeatherError, WeatherRequest,
    mail::{Mailer, WeatherEmail},
    provider::WeatherProvider,
    request::ValidationError,
    subscription::{Subscription, SubscriptionStore, SubscriptionUpdate},
};

const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_APP_URL: &str = "http://localhost:8080";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid subscription location: {0}")]
    InvalidLocation(#[from] ValidationError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error("failed to send weather email: {0}")]
    Mail(String),

    #[error("email sent but delivery time was not recorded: {0}")]
    Record(String),

    #[error("notification worker aborted: {0}")]
    Aborted(String),
}

#[derive(Debug)]
pub struct DispatchFailure {
    pub subscription_id: u64,
    pub error: DispatchError,
}

/// Per-subscription outcome of one run, sorted by subscription id.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub sent: Vec<u64>,
    pub failed: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    weather: Arc<dyn WeatherProvider>,
    mailer: Arc<dyn Mailer>,
    store: Arc<dyn SubscriptionStore>,
    app_url: Arc<str>,
    concurrency: usize,
    /// Subscriptions picked by `dispatch_due`, with the UTC date they were picked on.
    attempted: Arc<Mutex<HashMap<u64, NaiveDate>>>,
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("weather", &self.weather)
            .field("app_url", &self.app_url)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        mailer: Arc<dyn Mailer>,
        store: Arc<dyn SubscriptionStore>,
    ) -> Self {
        Self {
            weather,
            mailer,
            store,
            app_url: DEFAULT_APP_URL.into(),
            concurrency: DEFAULT_CONCURRENCY,
            attempted: Arc::default(),
        }
    }

    /// Number of subscriptions processed in parallel (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Base URL linked from the emails.
    pub fn with_app_url(mut self, app_url: &str) -> Self {
        self.app_url = app_url.into();
        self
    }

    /// Notify every active subscription regardless of schedule.
    pub async fn dispatch_all(&self) -> anyhow::Result<DispatchReport> {
        let subscriptions = self.store.active_subscriptions().await?;
        Ok(self.dispatch(subscriptions.into_iter().filter(|s| s.is_active).collect()).await)
    }

    /// Notify the subscriptions whose daily slot has come up at `now`.
    ///
    /// A subscription already attempted on `now`'s UTC date is skipped, whatever the
    /// outcome of that attempt was. Clones share this memory.
    pub async fn dispatch_due(&self, now: DateTime<Utc>) -> anyhow::Result<DispatchReport> {
        let subscriptions = self.store.active_subscriptions().await?;
        let today = now.date_naive();

        let due: Vec<Subscription> = {
            let mut attempted = self.attempted.lock().await;
            attempted.retain(|_, day| *day == today);

            subscriptions
                .into_iter()
                .filter(|s| s.is_due(now))
                .filter(|s| attempted.insert(s.id, today).is_none())
                .collect()
        };

        Ok(self.dispatch(due).await)
    }

    #[instrument(skip_all, fields(count = subscriptions.len()))]
    pub async fn dispatch(&self, subscriptions: Vec<Subscription>) -> DispatchReport {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut workers = JoinSet::new();
        let mut owners = HashMap::new();

        for subscription in subscriptions {
            let this = self.clone();
            let permits = Arc::clone(&permits);
            let id = subscription.id;

            let handle = workers.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let outcome = this.notify(&subscription).await;
                (subscription.id, outcome)
            });
            owners.insert(handle.id(), id);
        }

        let mut report = DispatchReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((id, Ok(()))) => {
                    info!(subscription_id = id, "Weather notification sent");
                    report.sent.push(id);
                }
                Ok((id, Err(err))) => {
                    error!(subscription_id = id, error = %err, "Failed to send weather notification");
                    report.failed.push(DispatchFailure { subscription_id: id, error: err });
                }
                Err(join_err) => {
                    let Some(&id) = owners.get(&join_err.id()) else {
                        error!(error = %join_err, "Notification worker aborted");
                        continue;
                    };
                    error!(subscription_id = id, error = %join_err, "Notification worker aborted");
                    report.failed.push(DispatchFailure {
                        subscription_id: id,
                        error: DispatchError::Aborted(join_err.to_string()),
                    });
                }
            }
        }

        report.sent.sort_unstable();
        report.failed.sort_by_key(|f| f.subscription_id);
        report
    }

    async fn notify(&self, subscription: &Subscription) -> Result<(), DispatchError> {
        let request = WeatherRequest::for_location(subscription.location.as_str())?;
        let weather = self.weather.get_weather(&request).await?;

        let email = WeatherEmail::weather_update(&weather, &self.app_url);
        self.mailer
            .send(&subscription.email, &email)
            .await
            .map_err(|e| DispatchError::Mail(format!("{e:#}")))?;

        let update = SubscriptionUpdate::MarkNotified { id: subscription.id, at: Utc::now() };
        self.store.apply(update).await.map_err(|e| DispatchError::Record(format!("{e:#}")))
    }
}
