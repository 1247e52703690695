use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use rayon::prelude::*;
use roaring::RoaringBitmap;
use serde::Serialize;
use tracing::debug;
use crate::analysis::tokenizer::{Tokenizer, WhitespaceTokenizer};
use crate::core::cancel::CancelToken;
use crate::core::config::EngineConfig;
use crate::core::error::{Error, Result};
use crate::core::types::Position;
use crate::index::phone_index::PhoneIndex;
use crate::index::word_index::WordIndex;
use crate::search::results::{Candidates, SearchHits};
use crate::search::strategy::{ChainOutcome, SearchContext, SearchQuery, StrategyChain};
use crate::store::record_store::RecordStore;

/// Shape of a built index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub records: usize,
    pub terms: usize,
    pub phone_buckets: usize,
    pub build_ms: u64,
}

/// Word index over customer names plus phone prefix/suffix buckets.
///
/// Built once per dataset generation and never mutated afterwards; every
/// position it holds refers to the store it was built from.
pub struct SearchIndex {
    pub(crate) words: WordIndex,
    pub(crate) phones: PhoneIndex,
    stats: IndexStats,
}

/// Per-chunk partial result of a parallel build.
struct PartialIndex {
    words: HashMap<String, RoaringBitmap>,
    phones: PhoneIndex,
}

impl SearchIndex {
    /// Build over the whole store.
    ///
    /// `should_stop` is polled before every chunk; when it returns true the
    /// build is abandoned with a `Cancelled` error.
    pub fn build<F>(store: &RecordStore, config: &EngineConfig, should_stop: F) -> Result<Self>
    where
        F: Fn() -> bool + Sync,
    {
        let start = Instant::now();
        let tokenizer = WhitespaceTokenizer;
        let chunk_size = config.build_chunk_size.max(1);
        let total = store.len();

        let partials: Vec<PartialIndex> = store
            .records()
            .par_chunks(chunk_size)
            .enumerate()
            .map(|(chunk_no, chunk)| -> Result<PartialIndex> {
                if should_stop() {
                    return Err(Error::cancelled());
                }

                let base = chunk_no * chunk_size;
                let mut partial = PartialIndex {
                    words: HashMap::new(),
                    phones: PhoneIndex::new(
                        config.phone_prefix_min,
                        config.phone_prefix_max,
                        config.phone_suffix_len,
                    ),
                };

                for (offset, record) in chunk.iter().enumerate() {
                    let position = (base + offset) as Position;
                    for token in tokenizer.tokenize(&record.customer_name) {
                        partial.words.entry(token.text).or_default().insert(position);
                    }
                    partial.phones.insert(&record.keys.phone_digits, position);
                }

                debug!(chunk = chunk_no, records = chunk.len(), total, "indexed chunk");
                Ok(partial)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut terms: BTreeMap<String, RoaringBitmap> = BTreeMap::new();
        let mut phones = PhoneIndex::new(
            config.phone_prefix_min,
            config.phone_prefix_max,
            config.phone_suffix_len,
        );

        for partial in partials {
            if should_stop() {
                return Err(Error::cancelled());
            }
            for (term, positions) in partial.words {
                *terms.entry(term).or_default() |= positions;
            }
            phones.merge(partial.phones);
        }

        let words = WordIndex::from_terms(terms)?;
        let stats = IndexStats {
            records: total,
            terms: words.term_count(),
            phone_buckets: phones.bucket_count(),
            build_ms: start.elapsed().as_millis() as u64,
        };

        Ok(SearchIndex { words, phones, stats })
    }

    /// Text search over `store`, the collection this index was built from.
    ///
    /// Runs the default strategy chain, so a substring that starts no word
    /// still matches through the scan fallback.
    pub fn search(&self, store: &RecordStore, raw_query: &str, config: &EngineConfig) -> Result<SearchHits> {
        let query = match SearchQuery::parse(raw_query) {
            Some(query) => query,
            None => {
                return Ok(SearchHits {
                    candidates: Candidates::All,
                    strategy: None,
                });
            }
        };

        let cancel = CancelToken::new();
        let ctx = SearchContext {
            store,
            index: Some(self),
            cancel: &cancel,
            phone_prefix_min: config.phone_prefix_min,
            scan_chunk_size: config.scan_chunk_size,
        };

        Ok(match StrategyChain::default().run(&query, &ctx)? {
            ChainOutcome::Resolved { hits, strategy } => SearchHits {
                candidates: Candidates::Positions(hits),
                strategy,
            },
            ChainOutcome::Unavailable => SearchHits {
                candidates: Candidates::Positions(RoaringBitmap::new()),
                strategy: None,
            },
        })
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn words(&self) -> &WordIndex {
        &self.words
    }

    pub fn phones(&self) -> &PhoneIndex {
        &self.phones
    }
}
