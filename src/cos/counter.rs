use crate::cos::client::CosConnector;
use crate::cos::store::ObjectStore;
use crate::error::TierError;
use crate::service::connection::{ConnectionProvider, Connector};
use crate::types::counter::{Count, CounterStore};
use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Counter kept as a JSON document `{"count": N}` under one object key.
pub struct ObjectCounter<C = CosConnector>
where
    C: Connector<Handle = Arc<dyn ObjectStore>>,
{
    provider: ConnectionProvider<C>,
    key: String,
    wait_interval: Duration,
    wait_attempts: usize,
}

impl<C> ObjectCounter<C>
where
    C: Connector<Handle = Arc<dyn ObjectStore>>,
{
    pub fn new(connector: C, key: impl Into<String>) -> Self {
        Self {
            provider: ConnectionProvider::new(connector),
            key: key.into(),
            wait_interval: Duration::from_secs(5),
            wait_attempts: 20,
        }
    }

    /// Poll schedule used after creating the document.
    pub fn with_wait(mut self, interval: Duration, attempts: usize) -> Self {
        self.wait_interval = interval;
        self.wait_attempts = attempts;
        self
    }
}

/// Existence probe, one-time creation, then read-increment-write.
pub async fn increment_object(
    store: &dyn ObjectStore,
    key: &str,
    wait_interval: Duration,
    wait_attempts: usize,
) -> Result<Count, TierError> {
    if !store.exists(key).await? {
        info!(key, "counter object missing; creating");
        let initial = serde_json::to_vec(&Count { count: 0 })?;
        store.put(key, initial).await?;
        wait_until_exists(store, key, wait_interval, wait_attempts).await?;
    }

    let body = store.get(key).await?;
    let mut document: Map<String, Value> = serde_json::from_slice(&body)?;
    let current = document
        .get("count")
        .and_then(Value::as_i64)
        .ok_or_else(|| TierError::MalformedCounter(format!("`{key}` has no integer count")))?;
    let next = current.checked_add(1).ok_or_else(|| {
        TierError::MalformedCounter(format!("`{key}` count {current} cannot grow"))
    })?;
    document.insert("count".to_string(), Value::from(next));

    let written = serde_json::to_vec(&document)?;
    store.put(key, written.clone()).await?;

    let count: Count = serde_json::from_slice(&written)?;
    info!(key, count = count.count, "object counter incremented");
    Ok(count)
}

async fn wait_until_exists(
    store: &dyn ObjectStore,
    key: &str,
    interval: Duration,
    attempts: usize,
) -> Result<(), TierError> {
    let policy = ConstantBuilder::default()
        .with_delay(interval)
        .with_max_times(attempts);

    (|| async move {
        if store.exists(key).await? {
            Ok(())
        } else {
            Err(TierError::ObjectNotVisible(key.to_string()))
        }
    })
    .retry(policy)
    .when(|e: &TierError| matches!(e, TierError::ObjectNotVisible(_)))
    .notify(|err, dur: Duration| {
        warn!("waiting for counter object: {}, sleeping {:?}", err, dur);
    })
    .await
}

#[async_trait]
impl<C> CounterStore for ObjectCounter<C>
where
    C: Connector<Handle = Arc<dyn ObjectStore>>,
{
    async fn increment(&self) -> Result<Count, TierError> {
        let store = self
            .provider
            .get_connection()
            .await
            .ok_or(TierError::BackendUnavailable(self.provider.backend()))?;
        increment_object(
            store.as_ref(),
            &self.key,
            self.wait_interval,
            self.wait_attempts,
        )
        .await
    }
}
