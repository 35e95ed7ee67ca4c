use serde::Serialize;
use serde_json::Value;

use crate::service::identity::Identity;
use crate::types::counter::Count;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CpuLoadResponse {
    pub pi: f64,
}

/// Outcome of one backend counter in an increment response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BackendReport {
    Count(Count),
    Message(String),
}

/// Identity plus the visit count, with optional backend and peer results.
#[derive(Debug, Serialize)]
pub struct IncrementResponse {
    #[serde(flatten)]
    pub identity: Identity,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgresql: Option<BackendReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cos: Option<BackendReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<Value>,
}
