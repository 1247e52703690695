use std::sync::Arc;
use std::time::Instant;
use parking_lot::RwLock;
use tracing::{debug, info};
use crate::aggregates::stats::Aggregates;
use crate::store::record_store::RecordStore;

/// Holds the aggregates of the current collection.
///
/// Staleness is judged by collection size only: a size mismatch triggers a
/// recompute on the next read.
pub struct AggregatesCache {
    snapshot: RwLock<Option<Arc<Aggregates>>>,
}

impl Default for AggregatesCache {
    fn default() -> Self {
        AggregatesCache::new()
    }
}

impl AggregatesCache {
    pub fn new() -> Self {
        AggregatesCache {
            snapshot: RwLock::new(None),
        }
    }

    pub fn compute_on_load(&self, store: &RecordStore) -> Arc<Aggregates> {
        let start = Instant::now();
        let aggregates = Arc::new(Aggregates::compute(store.records()));
        *self.snapshot.write() = Some(aggregates.clone());
        info!(
            records = store.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "aggregates computed"
        );
        aggregates
    }

    /// Last computed snapshot, if any.
    pub fn get(&self) -> Option<Arc<Aggregates>> {
        self.snapshot.read().clone()
    }

    pub fn is_stale(&self, store: &RecordStore) -> bool {
        match self.snapshot.read().as_ref() {
            Some(aggregates) => aggregates.record_count != store.len(),
            None => true,
        }
    }

    /// Current snapshot, recomputed first if it no longer matches `store`.
    pub fn invalidate_if_stale(&self, store: &RecordStore) -> Arc<Aggregates> {
        if let Some(current) = self.get() {
            if current.record_count == store.len() {
                return current;
            }
            debug!(
                cached = current.record_count,
                actual = store.len(),
                "aggregates stale"
            );
        }
        self.compute_on_load(store)
    }
}
