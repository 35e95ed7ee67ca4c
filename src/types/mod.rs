pub mod counter;
pub mod response;

pub use counter::{Count, CounterStore};
