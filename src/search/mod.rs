pub mod strategy;
pub mod results;
pub mod executor;
