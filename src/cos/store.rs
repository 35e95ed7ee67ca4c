use crate::error::TierError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Minimal object-store surface the counter needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Metadata probe. `Ok(false)` only for "not found"; every other failure is an error.
    async fn exists(&self, key: &str) -> Result<bool, TierError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, TierError>;

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), TierError>;
}

/// Process-local object store.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        let store = Self::default();
        store.lock().insert(key.into(), body.into());
        store
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // a poisoned map is still a consistent map
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, TierError> {
        Ok(self.lock().contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, TierError> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| TierError::ObjectStore {
                status: axum::http::StatusCode::NOT_FOUND,
                key: key.to_string(),
            })
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), TierError> {
        self.lock().insert(key.to_string(), body);
        Ok(())
    }
}
