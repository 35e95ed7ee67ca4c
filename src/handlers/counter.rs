use axum::{Json, extract::State};
use std::sync::Arc;
use tracing::info;

use crate::context::AppContext;
use crate::error::TierError;
use crate::router::TierState;
use crate::service::remote::remote_get;
use crate::types::counter::CounterStore;
use crate::types::response::{BackendReport, IncrementResponse};

/// GET /increment -> identity plus the in-process visit count.
pub async fn increment_handler(
    State(state): State<TierState>,
) -> Result<Json<IncrementResponse>, TierError> {
    let mut resp = visit(&state.ctx);
    resp.remote = forward(&state.ctx, "increment").await;
    Ok(Json(resp))
}

/// GET /postgresql -> `/increment` plus the table-backed counter.
pub async fn postgresql_handler(
    State(state): State<TierState>,
) -> Result<Json<IncrementResponse>, TierError> {
    let ctx = &state.ctx;
    let mut resp = visit(ctx);
    resp.postgresql = backend_report(ctx, "postgresql", ctx.postgresql()).await?;
    resp.remote = forward(ctx, "postgresql").await;
    Ok(Json(resp))
}

/// GET /cos -> `/increment` plus the object-backed counter.
pub async fn cos_handler(
    State(state): State<TierState>,
) -> Result<Json<IncrementResponse>, TierError> {
    let ctx = &state.ctx;
    let mut resp = visit(ctx);
    resp.cos = backend_report(ctx, "cos", ctx.cos()).await?;
    resp.remote = forward(ctx, "cos").await;
    Ok(Json(resp))
}

fn visit(ctx: &AppContext) -> IncrementResponse {
    IncrementResponse {
        identity: ctx.identity.clone(),
        count: ctx.next_visit(),
        postgresql: None,
        cos: None,
        remote: None,
    }
}

async fn forward(ctx: &AppContext, path: &str) -> Option<serde_json::Value> {
    let base = ctx.config.basic.remote_url.as_ref()?;
    Some(remote_get(&ctx.http, base, path, ctx.config.identity.timeout()).await)
}

/// Unconfigured and unreachable backends become a message; anything else fails the request.
async fn backend_report(
    ctx: &AppContext,
    name: &'static str,
    store: Option<&Arc<dyn CounterStore>>,
) -> Result<Option<BackendReport>, TierError> {
    if ctx.config.is_front() {
        info!("application configured for front end, no {name}");
        return Ok(None);
    }
    let Some(store) = store else {
        return Ok(Some(BackendReport::Message(format!(
            "no {name} backend configured; provide credentials to enable it"
        ))));
    };
    match store.increment().await {
        Ok(count) => Ok(Some(BackendReport::Count(count))),
        Err(e @ TierError::BackendUnavailable(_)) => Ok(Some(BackendReport::Message(e.to_string()))),
        Err(e) => Err(e),
    }
}
