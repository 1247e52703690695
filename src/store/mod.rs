pub mod source;
pub mod normalize;
pub mod loader;
pub mod record_store;
