use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tracing::{info, warn};
use crate::aggregates::cache::AggregatesCache;
use crate::aggregates::stats::{Aggregates, SalesStats};
use crate::core::cancel::CancelToken;
use crate::core::config::EngineConfig;
use crate::core::dataset::{Dataset, DatasetCell};
use crate::core::error::Result;
use crate::core::types::{Record, RecordId};
use crate::index::background::{IndexBuilder, IndexStatus};
use crate::query::cache::{CacheStats, QueryCache, QueryKey};
use crate::query::types::{FilterSpec, PageSpec, SortSpec};
use crate::search::executor::QueryExecutor;
use crate::search::results::{PageResult, QueryOutcome, SearchHits};
use crate::store::loader::{LoadProgress, RecordLoader};
use crate::store::record_store::RecordStore;
use crate::store::source::RecordSource;

/// Query engine over one in-memory sales collection.
///
/// Reads run concurrently on dataset snapshots. `reload` is the only writer:
/// it swaps in a new collection, drops cached pages, recomputes aggregates
/// and starts a fresh index build.
pub struct QueryEngine {
    config: EngineConfig,
    datasets: Arc<DatasetCell>,
    builder: Arc<IndexBuilder>,
    loader: RecordLoader,
    executor: QueryExecutor,
    cache: QueryCache,
    aggregates: AggregatesCache,
    reload_lock: Mutex<()>,
}

impl QueryEngine {
    /// Load `source` and start indexing it.
    pub fn open(source: &dyn RecordSource, config: EngineConfig) -> Result<Self> {
        let loader = RecordLoader::new(&config);
        let store = loader.load(source)?;
        Self::assemble(store, loader, config)
    }

    /// Serve an already-built collection.
    pub fn from_records(records: Vec<Record>, config: EngineConfig) -> Result<Self> {
        let loader = RecordLoader::new(&config);
        Self::assemble(RecordStore::from_records(records)?, loader, config)
    }

    fn assemble(store: RecordStore, loader: RecordLoader, config: EngineConfig) -> Result<Self> {
        let aggregates = AggregatesCache::new();
        aggregates.compute_on_load(&store);

        let engine = QueryEngine {
            datasets: Arc::new(DatasetCell::new(store)),
            builder: Arc::new(IndexBuilder::new(config.clone())),
            loader,
            executor: QueryExecutor::new(config.clone()),
            cache: QueryCache::new(config.result_cache_capacity, config.result_cache_max_page_size),
            aggregates,
            reload_lock: Mutex::new(()),
            config,
        };

        engine.builder.mark_building(engine.datasets.generation());
        engine.start_index_build()?;
        Ok(engine)
    }

    fn start_index_build(&self) -> Result<()> {
        if self.config.build_in_background {
            self.builder.spawn(self.datasets.clone());
            Ok(())
        } else {
            self.builder.build_now(&self.datasets)
        }
    }

    /// Replace the collection with a fresh load of `source`.
    ///
    /// On failure the current collection, index and caches stay untouched.
    pub fn reload(&self, source: &dyn RecordSource) -> Result<()> {
        let _guard = self.reload_lock.lock();

        let store = match self.loader.load(source) {
            Ok(store) => store,
            Err(e) => {
                warn!(source = %source.name(), error = %e, "reload failed, keeping current collection");
                return Err(e);
            }
        };

        let records = store.len();
        let generation = self.datasets.replace(store);
        self.cache.clear();
        self.aggregates.compute_on_load(&self.datasets.snapshot().store);
        self.builder.mark_building(generation);
        info!(generation, records, "collection reloaded");

        self.start_index_build()
    }

    pub fn execute_query(
        &self,
        filters: &FilterSpec,
        sort: SortSpec,
        page: PageSpec,
    ) -> Result<QueryOutcome<PageResult>> {
        self.execute_query_with(filters, sort, page, &CancelToken::new())
    }

    /// `execute_query` that gives up once `cancel` fires.
    pub fn execute_query_with(
        &self,
        filters: &FilterSpec,
        sort: SortSpec,
        page: PageSpec,
        cancel: &CancelToken,
    ) -> Result<QueryOutcome<PageResult>> {
        page.validate(self.config.max_page_size)?;
        let dataset = self.datasets.snapshot();

        let key = QueryKey {
            generation: dataset.generation,
            filters: filters.clone(),
            sort,
            page,
        };
        let cacheable = self.cache.accepts(&page);
        if cacheable {
            if let Some(cached) = self.cache.get(&key) {
                return Ok(QueryOutcome::Ready((*cached).clone()));
            }
        }

        match self.executor.execute(&dataset, filters, sort, page, cancel)? {
            Some(result) => {
                if cacheable {
                    self.cache.put(key, Arc::new(result.clone()));
                }
                Ok(QueryOutcome::Ready(result))
            }
            None => Ok(self.not_ready(&dataset)),
        }
    }

    /// Candidate set for a raw text query, without filters or paging.
    pub fn search(&self, query: &str) -> Result<QueryOutcome<SearchHits>> {
        let dataset = self.datasets.snapshot();
        match self.executor.search(&dataset, Some(query), &CancelToken::new())? {
            Some(hits) => Ok(QueryOutcome::Ready(hits)),
            None => Ok(self.not_ready(&dataset)),
        }
    }

    /// Filter options and global statistics, recomputed if stale.
    pub fn aggregates(&self) -> Arc<Aggregates> {
        let dataset = self.datasets.snapshot();
        self.aggregates.invalidate_if_stale(&dataset.store)
    }

    /// Statistics over the whole collection, or over what `filters` match.
    pub fn stats(&self, filters: Option<&FilterSpec>) -> Result<QueryOutcome<SalesStats>> {
        let filters = match filters {
            Some(filters) if !filters.is_empty() => filters,
            _ => return Ok(QueryOutcome::Ready(self.aggregates().stats)),
        };

        let dataset = self.datasets.snapshot();
        match self.executor.stats(&dataset, filters, &CancelToken::new())? {
            Some(stats) => Ok(QueryOutcome::Ready(stats)),
            None => Ok(self.not_ready(&dataset)),
        }
    }

    pub fn record(&self, id: RecordId) -> Option<Record> {
        self.datasets.snapshot().store.by_id(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.datasets.snapshot().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.datasets.generation()
    }

    pub fn index_status(&self) -> IndexStatus {
        self.builder.status()
    }

    pub fn is_index_ready(&self) -> bool {
        self.datasets.snapshot().index.is_some()
    }

    /// Block until the current collection is indexed. Returns false on
    /// timeout or a failed build.
    pub fn wait_for_index(&self, timeout: Duration) -> bool {
        self.builder.wait_until_ready(&self.datasets, timeout)
    }

    pub fn load_progress(&self) -> LoadProgress {
        self.loader.progress()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn not_ready<T>(&self, dataset: &Dataset) -> QueryOutcome<T> {
        match self.builder.status() {
            // status from an older generation says nothing about this snapshot
            IndexStatus::Ready { .. } => QueryOutcome::IndexNotReady(IndexStatus::Building {
                generation: dataset.generation,
            }),
            status => QueryOutcome::IndexNotReady(status),
        }
    }
}

impl Drop for QueryEngine {
    fn drop(&mut self) {
        self.builder.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::store::source::MemorySource;

    fn records(names: &[&str]) -> Vec<Record> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Record {
                id: RecordId(i as u64 + 1),
                customer_name: name.to_string(),
                ..Record::default()
            })
            .collect()
    }

    fn text_query(engine: &QueryEngine, query: &str) -> QueryOutcome<PageResult> {
        engine
            .execute_query(&FilterSpec::new().with_query(query), SortSpec::NATURAL, PageSpec::default())
            .unwrap()
    }

    #[test]
    fn text_queries_wait_for_the_reloaded_collection() {
        let engine =
            QueryEngine::from_records(records(&["Nishant Rao", "Kavya Iyer"]), EngineConfig::foreground()).unwrap();
        assert_eq!(text_query(&engine, "nish").ready().map(|p| p.total_items), Some(1));

        // hold the build slot so the reload cannot index
        assert!(engine.builder.try_acquire());
        engine
            .reload(&MemorySource::from_values(vec![
                json!({"id": 7, "customerName": "Nisha Patel", "date": "2024-01-01"}),
            ]))
            .unwrap();
        assert_eq!(engine.generation(), 2);

        assert_eq!(
            text_query(&engine, "nish"),
            QueryOutcome::IndexNotReady(IndexStatus::Building { generation: 2 })
        );
        let all = engine
            .execute_query(&FilterSpec::new(), SortSpec::NATURAL, PageSpec::default())
            .unwrap();
        assert_eq!(all.ready().map(|p| p.total_items), Some(1));
        assert!(!engine.wait_for_index(Duration::from_millis(20)));

        engine.builder.release();
        engine.start_index_build().unwrap();
        assert!(engine.wait_for_index(Duration::from_secs(5)));

        let page = text_query(&engine, "nish").ready().unwrap();
        assert_eq!(page.records[0].id, RecordId(7));
        assert_eq!(page.search_strategy, Some("index"));
    }

    #[test]
    fn ready_status_of_an_older_collection_reads_as_building() {
        let engine = QueryEngine::from_records(records(&["Nishant Rao"]), EngineConfig::foreground()).unwrap();
        assert!(matches!(engine.index_status(), IndexStatus::Ready { generation: 1, .. }));

        // swap the collection without announcing a build
        let store = RecordStore::from_records(records(&["Meera Das"])).unwrap();
        let generation = engine.datasets.replace(store);

        let status = match engine.search("mee").unwrap() {
            QueryOutcome::IndexNotReady(status) => status,
            QueryOutcome::Ready(_) => panic!("collection has no index yet"),
        };
        assert_eq!(status, IndexStatus::Building { generation });
    }

    #[test]
    fn empty_record_list_is_rejected() {
        let err = QueryEngine::from_records(Vec::new(), EngineConfig::foreground()).err().unwrap();
        assert_eq!(err.kind, crate::core::error::ErrorKind::EmptySource);
    }
}
