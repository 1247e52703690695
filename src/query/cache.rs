use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;
use crate::query::types::{FilterSpec, PageSpec, SortSpec};
use crate::search::results::PageResult;

/// Page cache for avoiding recomputation of repeated requests
pub struct QueryCache {
    cache: Option<Mutex<LruCache<QueryKey, Arc<PageResult>>>>,
    size_limit: usize,
    max_page_size: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QueryKey {
    pub generation: u64,
    pub filters: FilterSpec,
    pub sort: SortSpec,
    pub page: PageSpec,
}

impl QueryCache {
    /// A zero `size_limit` disables caching.
    pub fn new(size_limit: usize, max_page_size: usize) -> Self {
        QueryCache {
            cache: NonZeroUsize::new(size_limit).map(|cap| Mutex::new(LruCache::new(cap))),
            size_limit,
            max_page_size,
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn accepts(&self, page: &PageSpec) -> bool {
        self.cache.is_some() && page.page_size <= self.max_page_size
    }

    pub fn get(&self, key: &QueryKey) -> Option<Arc<PageResult>> {
        let cache = self.cache.as_ref()?;
        if let Some(results) = cache.lock().get(key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            Some(results.clone())
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn put(&self, key: QueryKey, results: Arc<PageResult>) {
        if !self.accepts(&key.page) {
            return;
        }
        if let Some(cache) = &self.cache {
            cache.lock().put(key, results);
        }
    }

    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            let mut cache = cache.lock();
            debug!(entries = cache.len(), "page cache cleared");
            cache.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.as_ref().map(|c| c.lock().len()).unwrap_or(0),
            capacity: self.size_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}
