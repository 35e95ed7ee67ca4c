use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::error::TierError;
use crate::router::TierState;
use crate::service::identity::Identity;
use crate::service::load::leibniz_pi;
use crate::types::response::{CpuLoadResponse, HealthResponse};

#[derive(Debug, Deserialize)]
pub struct CpuLoadQuery {
    pub load: Option<u32>,
}

/// GET / -> who served this request.
pub async fn identity_handler(State(state): State<TierState>) -> Json<Identity> {
    Json(state.ctx.identity.clone())
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// GET /cpu_load?load=N -> burn CPU on 10^N series terms.
pub async fn cpu_load_handler(
    State(state): State<TierState>,
    Query(query): Query<CpuLoadQuery>,
) -> Result<Json<CpuLoadResponse>, TierError> {
    let load = query.load.unwrap_or(1);
    let max = state.ctx.config.basic.cpu_load_max;
    if load > max {
        return Err(TierError::BadRequest(format!(
            "load {load} exceeds the maximum of {max}"
        )));
    }
    let pi = tokio::task::spawn_blocking(move || leibniz_pi(load)).await?;
    Ok(Json(CpuLoadResponse { pi }))
}
