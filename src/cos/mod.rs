//! Object-storage counter backend (IBM Cloud Object Storage).

pub mod client;
pub mod counter;
pub mod iam;
pub mod store;

pub use client::{CosClient, CosConnector};
pub use counter::{ObjectCounter, increment_object};
pub use store::{MemoryObjectStore, ObjectStore};
