use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TierError;

/// Wire shape shared by both counter backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub count: i64,
}

/// A singleton counter: create it if needed, then read-increment-write it.
///
/// Increments are not serialized across callers; two concurrent increments
/// can read the same value and one update is lost.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn increment(&self) -> Result<Count, TierError>;
}
