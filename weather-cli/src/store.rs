use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use weather_core::{Subscription, SubscriptionStore, SubscriptionUpdate};

/// Subscriptions kept as a JSON array in a single file.
#[derive(Debug)]
pub struct JsonSubscriptionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonSubscriptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    async fn read_all(&self) -> Result<Vec<Subscription>> {
        let contents = tokio::fs::read_to_string(&self.path).await.with_context(|| {
            format!("Failed to read subscriptions file: {}", self.path.display())
        })?;

        serde_json::from_str(&contents).with_context(|| {
            format!("Failed to parse subscriptions file: {}", self.path.display())
        })
    }

    async fn write_all(&self, subscriptions: &[Subscription]) -> Result<()> {
        let json = serde_json::to_string_pretty(subscriptions)
            .context("Failed to serialize subscriptions")?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))
    }
}

#[async_trait]
impl SubscriptionStore for JsonSubscriptionStore {
    async fn active_subscriptions(&self) -> Result<Vec<Subscription>> {
        let all = self.read_all().await?;
        Ok(all.into_iter().filter(|s| s.is_active).collect())
    }

    async fn apply(&self, update: SubscriptionUpdate) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let all = self.read_all().await?;
        let id = update.subscription_id();
        if !all.iter().any(|s| s.id == id) {
            anyhow::bail!("Subscription not found: ID {id}");
        }

        let updated: Vec<Subscription> = all.iter().map(|s| s.apply(&update)).collect();
        self.write_all(&updated).await
    }
}
