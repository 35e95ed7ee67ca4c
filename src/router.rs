use crate::context::AppContext;
use crate::handlers::{counter, info};
use axum::{Router, routing::get};
use std::sync::Arc;

#[derive(Clone)]
pub struct TierState {
    pub ctx: Arc<AppContext>,
}

impl TierState {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }
}

pub fn tier_router(state: TierState) -> Router {
    Router::new()
        .route("/", get(info::identity_handler))
        .route("/health", get(info::health_handler))
        .route("/cpu_load", get(info::cpu_load_handler))
        .route("/increment", get(counter::increment_handler))
        .route("/postgresql", get(counter::postgresql_handler))
        .route("/cos", get(counter::cos_handler))
        .with_state(state)
}
