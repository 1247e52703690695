pub mod types;
pub mod config;
pub mod error;
pub mod cancel;
pub mod dataset;
pub mod engine;
