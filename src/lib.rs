pub mod core;
pub mod analysis;
pub mod store;
pub mod index;
pub mod search;
pub mod query;
pub mod aggregates;

pub use crate::core::config::EngineConfig;
pub use crate::core::engine::QueryEngine;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{FilterField, Record, RecordId};
pub use crate::query::types::{FilterSpec, PageSpec, SortDirection, SortKey, SortSpec};
pub use crate::search::results::{PageResult, QueryOutcome};

/*
┌──────────────────────────────────────────────────────────────────────────────────┐
│                          SALESDEX STRUCT ARCHITECTURE                            │
└──────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── CORE LAYER ────────────────────────────────────┐
│                                                                                  │
│  struct QueryEngine                                                              │
│    config: EngineConfig                // limits, index shape, thread counts     │
│    datasets: Arc<DatasetCell>          // current Arc<Dataset> snapshot          │
│    builder: Arc<IndexBuilder>          // background index build + status        │
│    loader: RecordLoader                // source -> RecordStore, progress        │
│    executor: QueryExecutor             // search -> filter -> sort -> page       │
│    cache: QueryCache                   // LRU of small pages per generation      │
│    aggregates: AggregatesCache         // filter options + global stats          │
│                                                                                  │
│  struct Dataset { generation, store: Arc<RecordStore>, index: Option<Arc<..>> }  │
└──────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── STORE LAYER ───────────────────────────────────┐
│  trait RecordSource ── JsonLinesSource / MemorySource ── yields RawRecord rows   │
│  Normalizer: RawRecord -> Record (lenient numbers, dates, tags)                  │
│  RecordStore: non-empty Vec<Record>, lowercase keys, date-desc, id -> position   │
└──────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── INDEX LAYER ───────────────────────────────────┐
│  SearchIndex                                                                     │
│    words: WordIndex      // fst::Map term -> posting id, Vec<RoaringBitmap>      │
│    phones: PhoneIndex    // digit prefix buckets (3..=6) + 4-digit suffixes      │
│  IndexBuilder: rayon chunks -> partial indexes -> merge -> install if current    │
└──────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── QUERY FLOW ────────────────────────────────────┐
│                                                                                  │
│  execute_query(filters, sort, page)                                              │
│     │ validate page ─── cache hit? ──► PageResult                                │
│     ▼                                                                            │
│  StrategyChain [IndexLookup, SubstringScan] ──► Candidates (All | bitmap)        │
│     ▼                                                                            │
│  FilterEvaluator (age, date, fields, tags) ──► positions in collection order     │
│     ▼                                                                            │
│  sort_prefix (skipped for date desc) ──► page slice ──► PageResult               │
└──────────────────────────────────────────────────────────────────────────────────┘
*/
