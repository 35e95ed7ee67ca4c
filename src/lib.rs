pub mod config;
pub mod context;
pub mod cos;
pub mod db;
pub mod error;
pub mod handlers;
pub mod router;
pub mod service;
pub mod types;

pub use context::AppContext;
pub use error::TierError;
pub use types::counter::{Count, CounterStore};
