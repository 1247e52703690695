use rayon::prelude::*;
use roaring::RoaringBitmap;
use tracing::debug;
use crate::analysis::tokenizer::normalize_query;
use crate::core::cancel::CancelToken;
use crate::core::error::Result;
use crate::core::types::{digits_only, Position, Record};
use crate::index::search_index::SearchIndex;
use crate::store::record_store::RecordStore;

/// A free-text query in the forms the strategies need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub digits: String,
}

impl SearchQuery {
    /// `None` when the query is blank, meaning "no text filtering".
    pub fn parse(raw: &str) -> Option<Self> {
        let text = normalize_query(raw);
        if text.is_empty() {
            return None;
        }
        let digits = digits_only(&text);
        Some(SearchQuery { text, digits })
    }

    pub fn has_phone_digits(&self, min_len: usize) -> bool {
        self.digits.len() >= min_len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    Matched(RoaringBitmap),
    NoMatch,
    /// The strategy cannot serve this request (missing index, etc.).
    Unavailable,
}

/// What a strategy may read while answering one query.
pub struct SearchContext<'a> {
    pub store: &'a RecordStore,
    pub index: Option<&'a SearchIndex>,
    pub cancel: &'a CancelToken,
    pub phone_prefix_min: usize,
    pub scan_chunk_size: usize,
}

pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn search(&self, query: &SearchQuery, ctx: &SearchContext<'_>) -> Result<StrategyOutcome>;
}

/// Word-prefix and phone-bucket lookups, unioned.
pub struct IndexLookup;

impl SearchStrategy for IndexLookup {
    fn name(&self) -> &'static str {
        "index"
    }

    fn search(&self, query: &SearchQuery, ctx: &SearchContext<'_>) -> Result<StrategyOutcome> {
        let index = match ctx.index {
            Some(index) => index,
            None => return Ok(StrategyOutcome::Unavailable),
        };

        let mut hits = index.words().prefix_lookup(&query.text);
        if query.has_phone_digits(ctx.phone_prefix_min) {
            hits |= index.phones().lookup(&query.digits, ctx.store);
        }

        Ok(if hits.is_empty() {
            StrategyOutcome::NoMatch
        } else {
            StrategyOutcome::Matched(hits)
        })
    }
}

/// Linear "contains" scan over names and phones.
///
/// Only reached when the index found nothing, which keeps the O(n) path for
/// substrings that do not start a word (e.g. the middle of a name).
pub struct SubstringScan;

impl SubstringScan {
    fn matches(query: &SearchQuery, record: &Record, use_digits: bool) -> bool {
        record.keys.name.contains(&query.text)
            || record.keys.phone.contains(&query.text)
            || (use_digits && record.keys.phone_digits.contains(&query.digits))
    }
}

impl SearchStrategy for SubstringScan {
    fn name(&self) -> &'static str {
        "substring_scan"
    }

    fn search(&self, query: &SearchQuery, ctx: &SearchContext<'_>) -> Result<StrategyOutcome> {
        let chunk_size = ctx.scan_chunk_size.max(1);
        let use_digits = query.has_phone_digits(ctx.phone_prefix_min);

        let chunks: Vec<Vec<Position>> = ctx
            .store
            .records()
            .par_chunks(chunk_size)
            .enumerate()
            .map(|(chunk_no, chunk)| -> Result<Vec<Position>> {
                ctx.cancel.check()?;
                let base = chunk_no * chunk_size;
                Ok(chunk
                    .iter()
                    .enumerate()
                    .filter(|(_, record)| Self::matches(query, record, use_digits))
                    .map(|(offset, _)| (base + offset) as Position)
                    .collect())
            })
            .collect::<Result<Vec<_>>>()?;

        let hits: RoaringBitmap = chunks.into_iter().flatten().collect();
        debug!(query = %query.text, hits = hits.len(), "substring scan finished");

        Ok(if hits.is_empty() {
            StrategyOutcome::NoMatch
        } else {
            StrategyOutcome::Matched(hits)
        })
    }
}

/// Result of running a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// `strategy` names the first strategy that matched; `None` when every
    /// strategy ran and found nothing.
    Resolved {
        hits: RoaringBitmap,
        strategy: Option<&'static str>,
    },
    /// No strategy was able to run.
    Unavailable,
}

/// Ordered strategies, tried until one matches or all are exhausted.
pub struct StrategyChain {
    strategies: Vec<Box<dyn SearchStrategy>>,
}

impl Default for StrategyChain {
    fn default() -> Self {
        StrategyChain::new()
            .with(Box::new(IndexLookup))
            .with(Box::new(SubstringScan))
    }
}

impl StrategyChain {
    pub fn new() -> Self {
        StrategyChain {
            strategies: Vec::new(),
        }
    }

    pub fn with(mut self, strategy: Box<dyn SearchStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn run(&self, query: &SearchQuery, ctx: &SearchContext<'_>) -> Result<ChainOutcome> {
        let mut any_ran = false;

        for strategy in &self.strategies {
            match strategy.search(query, ctx)? {
                StrategyOutcome::Matched(hits) => {
                    debug!(strategy = strategy.name(), hits = hits.len(), "search resolved");
                    return Ok(ChainOutcome::Resolved {
                        hits,
                        strategy: Some(strategy.name()),
                    });
                }
                StrategyOutcome::NoMatch => any_ran = true,
                StrategyOutcome::Unavailable => {}
            }
        }

        Ok(if any_ran {
            ChainOutcome::Resolved {
                hits: RoaringBitmap::new(),
                strategy: None,
            }
        } else {
            ChainOutcome::Unavailable
        })
    }
}
