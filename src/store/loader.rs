use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Instant;
use serde::Serialize;
use tracing::{info, warn};
use crate::core::config::EngineConfig;
use crate::core::error::{Error, Result};
use crate::store::normalize::Normalizer;
use crate::store::record_store::RecordStore;
use crate::store::source::RecordSource;

const PROGRESS_LOG_EVERY: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadPhase {
    Idle,
    Reading,
    Sorting,
    Done,
    Failed,
}

impl LoadPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoadPhase::Reading,
            2 => LoadPhase::Sorting,
            3 => LoadPhase::Done,
            4 => LoadPhase::Failed,
            _ => LoadPhase::Idle,
        }
    }
}

/// Point-in-time view of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadProgress {
    pub phase: LoadPhase,
    pub rows_read: usize,
    pub rows_defaulted: usize,
}

/// Reads a source into a `RecordStore`, tracking its own progress.
///
/// The counters are only written by `load`; everyone else goes through
/// `progress()`.
pub struct RecordLoader {
    normalizer: Normalizer,
    phase: Arc<AtomicU8>,
    rows_read: Arc<AtomicUsize>,
    rows_defaulted: Arc<AtomicUsize>,
}

impl RecordLoader {
    pub fn new(config: &EngineConfig) -> Self {
        RecordLoader {
            normalizer: Normalizer::new(config.tag_delimiter),
            phase: Arc::new(AtomicU8::new(0)),
            rows_read: Arc::new(AtomicUsize::new(0)),
            rows_defaulted: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            phase: LoadPhase::from_u8(self.phase.load(Ordering::Acquire)),
            rows_read: self.rows_read.load(Ordering::Relaxed),
            rows_defaulted: self.rows_defaulted.load(Ordering::Relaxed),
        }
    }

    fn set_phase(&self, phase: LoadPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    pub fn load(&self, source: &dyn RecordSource) -> Result<RecordStore> {
        let start = Instant::now();
        self.rows_read.store(0, Ordering::Relaxed);
        self.rows_defaulted.store(0, Ordering::Relaxed);
        self.set_phase(LoadPhase::Reading);
        info!(source = %source.name(), "loading records");

        match self.read_all(source) {
            Ok(store) => {
                self.set_phase(LoadPhase::Done);
                let progress = self.progress();
                if progress.rows_defaulted > 0 {
                    warn!(
                        rows = progress.rows_defaulted,
                        "rows had unusable fields and were loaded with defaults"
                    );
                }
                info!(
                    records = store.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "records loaded"
                );
                Ok(store)
            }
            Err(e) => {
                self.set_phase(LoadPhase::Failed);
                Err(e)
            }
        }
    }

    fn read_all(&self, source: &dyn RecordSource) -> Result<RecordStore> {
        let mut records = Vec::new();

        for (index, row) in source.rows()?.enumerate() {
            let row = row?;
            let (record, defaulted) = self.normalizer.normalize(&row.raw, index as u64 + 1);
            if defaulted || row.malformed {
                self.rows_defaulted.fetch_add(1, Ordering::Relaxed);
            }
            records.push(record);

            let read = self.rows_read.fetch_add(1, Ordering::Relaxed) + 1;
            if read % PROGRESS_LOG_EVERY == 0 {
                info!(rows = read, "load progress");
            }
        }

        self.set_phase(LoadPhase::Sorting);
        RecordStore::from_records(records)
            .map_err(|e| Error::new(e.kind, format!("Source '{}': {}", source.name(), e.context)))
    }
}
