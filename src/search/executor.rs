use std::time::Instant;
use tracing::debug;
use crate::aggregates::stats::SalesStats;
use crate::core::cancel::CancelToken;
use crate::core::config::EngineConfig;
use crate::core::dataset::Dataset;
use crate::core::error::Result;
use crate::core::types::Position;
use crate::query::filter::FilterEvaluator;
use crate::query::sort::{page_bounds, sort_prefix, total_pages};
use crate::query::types::{FilterSpec, PageSpec, SortSpec};
use crate::search::results::{Candidates, MatchSet, PageResult, SearchHits};
use crate::search::strategy::{ChainOutcome, SearchContext, SearchQuery, StrategyChain};

/// Runs one request against a dataset snapshot:
/// text search -> filter -> count -> order -> slice.
///
/// Every method returns `Ok(None)` when the request carries a text query and
/// the snapshot has no index yet; callers turn that into a not-ready answer.
pub struct QueryExecutor {
    config: EngineConfig,
    chain: StrategyChain,
}

impl QueryExecutor {
    pub fn new(config: EngineConfig) -> Self {
        QueryExecutor::with_chain(config, StrategyChain::default())
    }

    pub fn with_chain(config: EngineConfig, chain: StrategyChain) -> Self {
        QueryExecutor { config, chain }
    }

    /// Resolve the text part of a request into a candidate set.
    pub fn search(
        &self,
        dataset: &Dataset,
        raw_query: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Option<SearchHits>> {
        let query = match raw_query.and_then(SearchQuery::parse) {
            Some(query) => query,
            None => {
                return Ok(Some(SearchHits {
                    candidates: Candidates::All,
                    strategy: None,
                }));
            }
        };

        let index = match &dataset.index {
            Some(index) => index,
            None => return Ok(None),
        };

        let ctx = SearchContext {
            store: &dataset.store,
            index: Some(index.as_ref()),
            cancel,
            phone_prefix_min: self.config.phone_prefix_min,
            scan_chunk_size: self.config.scan_chunk_size,
        };

        Ok(match self.chain.run(&query, &ctx)? {
            ChainOutcome::Resolved { hits, strategy } => Some(SearchHits {
                candidates: Candidates::Positions(hits),
                strategy,
            }),
            ChainOutcome::Unavailable => None,
        })
    }

    /// Every position satisfying the request, in collection order.
    pub fn matching(
        &self,
        dataset: &Dataset,
        filters: &FilterSpec,
        cancel: &CancelToken,
    ) -> Result<Option<(MatchSet, Option<&'static str>)>> {
        let hits = match self.search(dataset, filters.query.as_deref(), cancel)? {
            Some(hits) => hits,
            None => return Ok(None),
        };

        let evaluator = FilterEvaluator::new(filters, &self.config);
        let matches = if hits.candidates.is_all() && evaluator.compiled().is_pass_all() {
            MatchSet::All(dataset.store.len())
        } else {
            MatchSet::Positions(evaluator.apply(&dataset.store, &hits.candidates, cancel)?)
        };

        Ok(Some((matches, hits.strategy)))
    }

    /// One page of the request. `page` must already be validated.
    pub fn execute(
        &self,
        dataset: &Dataset,
        filters: &FilterSpec,
        sort: SortSpec,
        page: PageSpec,
        cancel: &CancelToken,
    ) -> Result<Option<PageResult>> {
        let start = Instant::now();
        let (matches, strategy) = match self.matching(dataset, filters, cancel)? {
            Some(found) => found,
            None => return Ok(None),
        };

        let total_items = matches.len();
        let bounds = page_bounds(total_items, &page);
        let store = &dataset.store;

        let page_positions: Vec<Position> = match matches {
            MatchSet::All(_) if sort.is_natural() => {
                (bounds.start as Position..bounds.end as Position).collect()
            }
            MatchSet::All(len) => {
                let mut positions: Vec<Position> = (0..len as Position).collect();
                cancel.check()?;
                sort_prefix(store, &mut positions, sort, bounds.end);
                positions[bounds.clone()].to_vec()
            }
            MatchSet::Positions(mut positions) => {
                cancel.check()?;
                sort_prefix(store, &mut positions, sort, bounds.end);
                positions[bounds.clone()].to_vec()
            }
        };

        let records = page_positions
            .iter()
            .map(|position| store.at(*position).clone())
            .collect();

        let total_pages = total_pages(total_items, page.page_size);
        let result = PageResult {
            records,
            total_items,
            current_page: page.page,
            total_pages,
            page_size: page.page_size,
            has_next_page: page.page < total_pages,
            has_prev_page: page.page > 1,
            search_strategy: strategy,
        };

        debug!(
            generation = dataset.generation,
            total = total_items,
            page = page.page,
            returned = result.records.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "query executed"
        );

        Ok(Some(result))
    }

    /// Sales statistics over everything the filters match.
    pub fn stats(
        &self,
        dataset: &Dataset,
        filters: &FilterSpec,
        cancel: &CancelToken,
    ) -> Result<Option<SalesStats>> {
        let (matches, _) = match self.matching(dataset, filters, cancel)? {
            Some(found) => found,
            None => return Ok(None),
        };

        let store = &dataset.store;
        Ok(Some(match matches {
            MatchSet::All(_) => SalesStats::from_records(store.records()),
            MatchSet::Positions(positions) => {
                SalesStats::from_records(positions.iter().map(|p| store.at(*p)))
            }
        }))
    }
}
