use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A standing request for a daily weather email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub email: String,
    pub location: String,
    /// Time of day (UTC) after which today's email may go out.
    pub notification_time: NaiveTime,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub last_notified_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// State change to persist for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionUpdate {
    MarkNotified { id: u64, at: DateTime<Utc> },
}

impl SubscriptionUpdate {
    pub fn subscription_id(&self) -> u64 {
        match self {
            SubscriptionUpdate::MarkNotified { id, .. } => *id,
        }
    }
}

impl Subscription {
    /// Whether today's notification is owed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active || now.time() < self.notification_time {
            return false;
        }

        self.last_notified_at.is_none_or(|last| last.date_naive() < now.date_naive())
    }

    /// New state with `update` applied. Updates addressed to another id are ignored.
    pub fn apply(&self, update: &SubscriptionUpdate) -> Subscription {
        if update.subscription_id() != self.id {
            return self.clone();
        }

        match *update {
            SubscriptionUpdate::MarkNotified { at, .. } => {
                Subscription { last_notified_at: Some(at), ..self.clone() }
            }
        }
    }
}

/// Persistence collaborator for subscriptions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn active_subscriptions(&self) -> anyhow::Result<Vec<Subscription>>;

    async fn apply(&self, update: SubscriptionUpdate) -> anyhow::Result<()>;
}
