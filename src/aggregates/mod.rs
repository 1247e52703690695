pub mod stats;
pub mod cache;
