//! Lazily created, process-lifetime backend handles.

use crate::error::TierError;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Builds a handle to one backend.
#[async_trait]
pub trait Connector: Send + Sync {
    type Handle: Clone + Send + Sync;

    /// Short backend name used in logs and errors.
    fn backend(&self) -> &'static str;

    async fn connect(&self) -> Result<Self::Handle, TierError>;
}

/// Holds at most one handle per backend.
///
/// The first call to [`ConnectionProvider::get_connection`] runs the
/// connector. Its outcome is kept for the life of the provider: a failed
/// attempt is stored as `None` and never retried.
pub struct ConnectionProvider<C: Connector> {
    connector: C,
    handle: OnceCell<Option<C::Handle>>,
}

impl<C: Connector> ConnectionProvider<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            handle: OnceCell::new(),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.connector.backend()
    }

    pub async fn get_connection(&self) -> Option<C::Handle> {
        self.handle
            .get_or_init(|| async move {
                let backend = self.connector.backend();
                info!(backend, "connecting");
                match self.connector.connect().await {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        warn!(backend, error = %e, "connection failed; backend disabled for this process");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// Handle already settled; `None` if no attempt has been made yet.
    pub fn settled(&self) -> Option<bool> {
        self.handle.get().map(Option::is_some)
    }
}
