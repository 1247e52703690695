pub mod types;
pub mod filter;
pub mod sort;
pub mod cache;
