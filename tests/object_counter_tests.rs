use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use vpc3tier::cos::{MemoryObjectStore, ObjectCounter, ObjectStore, increment_object};
use vpc3tier::service::connection::Connector;
use vpc3tier::{Count, CounterStore, TierError};

const KEY: &str = "data";

/// Hands out a prepared store, or fails when there is none.
struct StaticConnector(Option<Arc<dyn ObjectStore>>);

#[async_trait]
impl Connector for StaticConnector {
    type Handle = Arc<dyn ObjectStore>;

    fn backend(&self) -> &'static str {
        "cos"
    }

    async fn connect(&self) -> Result<Self::Handle, TierError> {
        self.0
            .clone()
            .ok_or(TierError::IamToken(StatusCode::UNAUTHORIZED))
    }
}

/// Existence check always fails with the given status.
struct FailingExistsCheck(StatusCode);

#[async_trait]
impl ObjectStore for FailingExistsCheck {
    async fn exists(&self, key: &str) -> Result<bool, TierError> {
        Err(TierError::ObjectStore {
            status: self.0,
            key: key.to_string(),
        })
    }

    async fn get(&self, _key: &str) -> Result<Vec<u8>, TierError> {
        unreachable!("get after failed existence check")
    }

    async fn put(&self, _key: &str, _body: Vec<u8>) -> Result<(), TierError> {
        unreachable!("put after failed existence check")
    }
}

/// Newly written objects only show up after a few existence checks.
struct SlowVisibility {
    inner: MemoryObjectStore,
    hidden_checks: AtomicUsize,
}

#[async_trait]
impl ObjectStore for SlowVisibility {
    async fn exists(&self, key: &str) -> Result<bool, TierError> {
        if self.inner.exists(key).await? {
            let remaining = self.hidden_checks.load(Ordering::SeqCst);
            if remaining > 0 {
                self.hidden_checks.store(remaining - 1, Ordering::SeqCst);
                return Ok(false);
            }
            return Ok(true);
        }
        Ok(false)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, TierError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), TierError> {
        self.inner.put(key, body).await
    }
}

fn counter(store: Arc<dyn ObjectStore>) -> ObjectCounter<StaticConnector> {
    ObjectCounter::new(StaticConnector(Some(store)), KEY).with_wait(Duration::from_millis(1), 5)
}

fn stored(store: &MemoryObjectStore) -> serde_json::Value {
    serde_json::from_slice(&store.object(KEY).expect("object")).unwrap()
}

#[tokio::test]
async fn first_increment_creates_the_document() {
    let store = Arc::new(MemoryObjectStore::new());
    let counter = counter(store.clone());

    assert_eq!(counter.increment().await.unwrap(), Count { count: 1 });
    assert_eq!(stored(&store), serde_json::json!({ "count": 1 }));
}

#[tokio::test]
async fn sequential_increments_count_up() {
    let store = Arc::new(MemoryObjectStore::with_object(KEY, r#"{"count": 0}"#));
    let counter = counter(store.clone());

    for i in 1..=4 {
        assert_eq!(counter.increment().await.unwrap(), Count { count: i });
    }
    assert_eq!(stored(&store)["count"], 4);
}

#[tokio::test]
async fn other_document_fields_survive() {
    let store = Arc::new(MemoryObjectStore::with_object(
        KEY,
        r#"{"count": 9, "owner": "tier-3"}"#,
    ));
    let counter = counter(store.clone());

    assert_eq!(counter.increment().await.unwrap(), Count { count: 10 });
    assert_eq!(
        stored(&store),
        serde_json::json!({ "count": 10, "owner": "tier-3" })
    );
}

#[tokio::test]
async fn existence_failures_other_than_not_found_propagate() {
    let counter = counter(Arc::new(FailingExistsCheck(StatusCode::FORBIDDEN)));
    let err = counter.increment().await.unwrap_err();
    assert!(matches!(
        err,
        TierError::ObjectStore {
            status: StatusCode::FORBIDDEN,
            ..
        }
    ));
}

#[tokio::test]
async fn document_without_count_is_malformed() {
    let store = Arc::new(MemoryObjectStore::with_object(KEY, r#"{"total": 3}"#));
    let err = counter(store).increment().await.unwrap_err();
    assert!(matches!(err, TierError::MalformedCounter(_)));
}

#[tokio::test]
async fn count_at_the_integer_limit_is_not_incremented() {
    let store = Arc::new(MemoryObjectStore::with_object(
        KEY,
        format!(r#"{{"count": {}}}"#, i64::MAX),
    ));
    let err = counter(store.clone()).increment().await.unwrap_err();
    assert!(matches!(err, TierError::MalformedCounter(_)), "{err}");
    assert_eq!(stored(&store)["count"], i64::MAX);
}

#[tokio::test]
async fn creation_waits_until_the_object_is_visible() {
    let store = SlowVisibility {
        inner: MemoryObjectStore::new(),
        hidden_checks: AtomicUsize::new(2),
    };
    let count = increment_object(&store, KEY, Duration::from_millis(1), 5)
        .await
        .unwrap();
    assert_eq!(count, Count { count: 1 });
}

#[tokio::test]
async fn creation_gives_up_after_the_wait_budget() {
    let store = SlowVisibility {
        inner: MemoryObjectStore::new(),
        hidden_checks: AtomicUsize::new(100),
    };
    let err = increment_object(&store, KEY, Duration::from_millis(1), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, TierError::ObjectNotVisible(_)));
}

#[tokio::test]
async fn failed_connection_is_reported_as_unavailable() {
    let counter = ObjectCounter::new(StaticConnector(None), KEY);
    for _ in 0..2 {
        let err = counter.increment().await.unwrap_err();
        assert!(matches!(err, TierError::BackendUnavailable("cos")));
    }
}
