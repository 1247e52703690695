use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use crate::core::config::EngineConfig;
use crate::core::dataset::DatasetCell;
use crate::core::error::Result;
use crate::index::search_index::{IndexStats, SearchIndex};

/// Lifecycle of the search index for the current dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum IndexStatus {
    NotStarted,
    Building { generation: u64 },
    Ready { generation: u64, stats: IndexStats },
    Failed { generation: u64, reason: String },
}

/// Runs index builds, one at a time, off the request path.
///
/// `building` guards against overlapping builds: asking for a build while one
/// runs is a no-op. The running build loops until the newest dataset has an
/// index, so a reload during a build is still picked up.
pub struct IndexBuilder {
    config: EngineConfig,
    pool: Option<rayon::ThreadPool>,
    building: AtomicBool,
    shutdown: AtomicBool,
    status: Mutex<IndexStatus>,
    changed: Condvar,
}

impl IndexBuilder {
    pub fn new(config: EngineConfig) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.index_threads.max(1))
            .thread_name(|i| format!("salesdex-index-{}", i))
            .build();

        let pool = match pool {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, "index thread pool unavailable, using the global pool");
                None
            }
        };

        IndexBuilder {
            config,
            pool,
            building: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            status: Mutex::new(IndexStatus::NotStarted),
            changed: Condvar::new(),
        }
    }

    pub fn status(&self) -> IndexStatus {
        self.status.lock().clone()
    }

    fn set_status(&self, status: IndexStatus) {
        *self.status.lock() = status;
        self.changed.notify_all();
    }

    /// Record that `generation` is waiting for an index.
    pub fn mark_building(&self, generation: u64) {
        self.set_status(IndexStatus::Building { generation });
    }

    /// Stop any running build at its next chunk boundary.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.changed.notify_all();
    }

    /// Take the build slot. False while another build holds it.
    pub(crate) fn try_acquire(&self) -> bool {
        self.building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release(&self) {
        self.building.store(false, Ordering::Release);
    }

    /// Start a background build. Returns false if one is already running.
    pub fn spawn(self: &Arc<Self>, datasets: Arc<DatasetCell>) -> bool {
        if !self.try_acquire() {
            debug!("index build already in progress");
            return false;
        }

        let builder = Arc::clone(self);
        let pending = Arc::clone(&datasets);
        let spawned = thread::Builder::new()
            .name("salesdex-index-builder".to_string())
            .spawn(move || {
                if let Err(e) = builder.run(&datasets) {
                    error!(error = %e, "background index build failed");
                }
            });

        match spawned {
            Ok(_) => true,
            Err(e) => {
                self.start_failed(&pending, e.to_string());
                false
            }
        }
    }

    fn start_failed(&self, datasets: &DatasetCell, reason: String) {
        self.release();
        let generation = datasets.generation();
        error!(generation, reason = %reason, "could not start index build thread");
        self.set_status(IndexStatus::Failed { generation, reason });
    }

    /// Build on the calling thread. A no-op if a build is already running.
    pub fn build_now(&self, datasets: &DatasetCell) -> Result<()> {
        if !self.try_acquire() {
            debug!("index build already in progress");
            return Ok(());
        }
        self.run(datasets)
    }

    /// Block until the current dataset has an index, the build failed, or
    /// `timeout` passes. Returns whether an index is installed.
    pub fn wait_until_ready(&self, datasets: &DatasetCell, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut status = self.status.lock();

        loop {
            if datasets.snapshot().index.is_some() {
                return true;
            }
            if matches!(*status, IndexStatus::Failed { .. }) || self.shutdown.load(Ordering::Acquire) {
                return false;
            }
            if self.changed.wait_until(&mut status, deadline).timed_out() {
                return datasets.snapshot().index.is_some();
            }
        }
    }

    fn run(&self, datasets: &DatasetCell) -> Result<()> {
        loop {
            let result = self.build_pending(datasets);
            self.release();

            // a reload may have landed between the last check and the release
            let pending = result.is_ok()
                && !self.shutdown.load(Ordering::Acquire)
                && datasets.snapshot().index.is_none();

            if !pending || !self.try_acquire() {
                return result;
            }
        }
    }

    fn build_pending(&self, datasets: &DatasetCell) -> Result<()> {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return Ok(());
            }

            let dataset = datasets.snapshot();
            if dataset.index.is_some() {
                return Ok(());
            }

            let generation = dataset.generation;
            self.set_status(IndexStatus::Building { generation });
            info!(generation, records = dataset.store.len(), "building search index");

            let should_stop = || {
                self.shutdown.load(Ordering::Acquire) || datasets.generation() != generation
            };
            let built = match &self.pool {
                Some(pool) => pool.install(|| SearchIndex::build(&dataset.store, &self.config, should_stop)),
                None => SearchIndex::build(&dataset.store, &self.config, should_stop),
            };

            match built {
                Ok(index) => {
                    let stats = index.stats();
                    // install under the status lock so waiters see index and status together
                    let mut status = self.status.lock();
                    if datasets.install_index(generation, Arc::new(index)) {
                        *status = IndexStatus::Ready { generation, stats };
                        drop(status);
                        self.changed.notify_all();
                        info!(
                            generation,
                            terms = stats.terms,
                            phone_buckets = stats.phone_buckets,
                            build_ms = stats.build_ms,
                            "search index ready"
                        );
                    } else {
                        drop(status);
                        debug!(generation, "index superseded by reload before install");
                    }
                }
                Err(e) if e.is_cancelled() => {
                    debug!(generation, "index build abandoned");
                }
                Err(e) => {
                    error!(generation, error = %e, "index build failed");
                    self.set_status(IndexStatus::Failed {
                        generation,
                        reason: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }
    }
}
