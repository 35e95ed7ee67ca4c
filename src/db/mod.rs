//! Relational counter backend.
//!
//! Layout:
//! - `schema.rs`: SQL for the `count` table
//! - `connector.rs`: builds the `AnyPool` from resolved credentials
//! - `counter.rs`: table bootstrap and the increment transaction

pub mod connector;
pub mod counter;
pub mod schema;

pub use connector::DbConnector;
pub use counter::{RelationalCounter, ensure_table, increment};
pub use schema::COUNTER_TABLE;
