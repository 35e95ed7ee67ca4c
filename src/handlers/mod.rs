pub mod counter;
pub mod info;
