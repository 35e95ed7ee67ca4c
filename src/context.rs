use crate::config::Config;
use crate::cos::{CosConnector, ObjectCounter};
use crate::db::{DbConnector, RelationalCounter};
use crate::error::TierError;
use crate::service::credential_loader;
use crate::service::identity::Identity;
use crate::types::counter::CounterStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Everything a request handler needs, built once at startup.
pub struct AppContext {
    pub config: Config,
    pub identity: Identity,
    pub http: reqwest::Client,
    visits: AtomicU64,
    postgresql: Option<Arc<dyn CounterStore>>,
    cos: Option<Arc<dyn CounterStore>>,
}

impl AppContext {
    pub fn new(config: Config, identity: Identity, http: reqwest::Client) -> Self {
        Self {
            config,
            identity,
            http,
            visits: AtomicU64::new(0),
            postgresql: None,
            cos: None,
        }
    }

    pub fn with_postgresql(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.postgresql = Some(store);
        self
    }

    pub fn with_cos(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.cos = Some(store);
        self
    }

    /// Build the HTTP client, resolve identity and wire whichever backends are configured.
    ///
    /// Backends connect lazily on their first request.
    pub async fn from_config(config: Config) -> Result<Self, TierError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vpc3tier/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        let identity = Identity::discover(&http, &config.identity).await;

        let postgresql = postgresql_store(&config);
        let cos = cos_store(&config);

        let mut ctx = Self::new(config, identity, http);
        ctx.postgresql = postgresql;
        ctx.cos = cos;
        Ok(ctx)
    }

    /// Bump the in-process visit counter.
    pub fn next_visit(&self) -> u64 {
        self.visits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn postgresql(&self) -> Option<&Arc<dyn CounterStore>> {
        self.postgresql.as_ref()
    }

    pub fn cos(&self) -> Option<&Arc<dyn CounterStore>> {
        self.cos.as_ref()
    }
}

fn postgresql_store(config: &Config) -> Option<Arc<dyn CounterStore>> {
    if !config.postgresql.enabled {
        info!("postgresql backend disabled");
        return None;
    }
    if config.is_front() {
        info!("application configured for front end, no postgresql");
        return None;
    }
    match credential_loader::resolve(&config.basic.app_dir) {
        Ok(Some(resolved)) => {
            info!(source = ?resolved.source, "postgresql credentials resolved");
            let connector = DbConnector::postgres(resolved, &config.postgresql);
            Some(Arc::new(RelationalCounter::new(connector)))
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "failed to load postgresql credentials");
            None
        }
    }
}

fn cos_store(config: &Config) -> Option<Arc<dyn CounterStore>> {
    if !config.cos.enabled {
        info!("cos backend disabled");
        return None;
    }
    if config.is_front() {
        info!("application configured for front end, no cos");
        return None;
    }
    let Some(connector) = CosConnector::from_config(&config.cos) else {
        info!("no cos api key or bucket configured");
        return None;
    };
    info!(
        endpoint = %config.cos.endpoint,
        bucket = config.cos.bucket.as_deref().unwrap_or_default(),
        key = %config.cos.object_key,
        "cos backend configured"
    );
    let counter = ObjectCounter::new(connector, config.cos.object_key.clone())
        .with_wait(config.cos.wait_interval(), config.cos.wait_attempts);
    Some(Arc::new(counter))
}
