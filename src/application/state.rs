use std::{collections::HashMap, sync::Arc, time::Instant};

use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock};

use crate::{
    application::config::RuntimeConfig, domain::error::DomainError, storage::SqliteStore,
    upstream::UpstreamClient,
};

#[derive(Clone)]
pub struct SharedState {
    inner: Arc<InnerState>,
}

struct InnerState {
    config: RuntimeConfig,
    store: SqliteStore,
    upstream: UpstreamClient,
    refresh_locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
    started_at: Instant,
}

impl SharedState {
    pub async fn new(config: RuntimeConfig) -> Result<Self, DomainError> {
        let store = SqliteStore::connect(&config.db_path).await?;
        let upstream = UpstreamClient::new(&config)?;

        Ok(Self {
            inner: Arc::new(InnerState {
                config,
                store,
                upstream,
                refresh_locks: RwLock::new(HashMap::new()),
                started_at: Instant::now(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.inner.store
    }

    #[must_use]
    pub fn upstream(&self) -> &UpstreamClient {
        &self.inner.upstream
    }

    /// Serializes token refreshes per user. Slack fires an options load on
    /// every keystroke, and a rotated refresh token is only valid once.
    pub async fn refresh_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.inner.refresh_locks.read().await.get(user_id) {
            return lock.clone();
        }

        self.inner
            .refresh_locks
            .write()
            .await
            .entry(user_id.to_owned())
            .or_default()
            .clone()
    }

    #[must_use]
    pub fn uptime_ms(&self) -> u64 {
        u64::try_from(self.inner.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub async fn health_payload(&self) -> Result<Value, DomainError> {
        self.store().ping().await?;

        Ok(json!({
            "ok": true,
            "version": env!("CARGO_PKG_VERSION"),
            "uptimeMs": self.uptime_ms(),
            "tokenRefresh": self.config().refresh_enabled(),
        }))
    }
}
