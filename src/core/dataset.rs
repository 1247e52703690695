use std::sync::Arc;
use parking_lot::RwLock;
use crate::index::search_index::SearchIndex;
use crate::store::record_store::RecordStore;

/// One loaded collection and, once built, the index derived from it.
///
/// A request clones the `Arc<Dataset>` once and works on that snapshot, so a
/// concurrent reload or index install never changes what it sees.
pub struct Dataset {
    pub generation: u64,
    pub store: Arc<RecordStore>,
    pub index: Option<Arc<SearchIndex>>,
}

/// Holder of the current dataset. Writers swap whole snapshots.
pub struct DatasetCell {
    current: RwLock<Arc<Dataset>>,
}

impl DatasetCell {
    pub fn new(store: RecordStore) -> Self {
        DatasetCell {
            current: RwLock::new(Arc::new(Dataset {
                generation: 1,
                store: Arc::new(store),
                index: None,
            })),
        }
    }

    pub fn snapshot(&self) -> Arc<Dataset> {
        self.current.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Install a freshly loaded store without an index. Returns its generation.
    pub fn replace(&self, store: RecordStore) -> u64 {
        let mut current = self.current.write();
        let generation = current.generation + 1;
        *current = Arc::new(Dataset {
            generation,
            store: Arc::new(store),
            index: None,
        });
        generation
    }

    /// Attach `index` if the dataset is still at `generation`.
    ///
    /// Returns false when a reload happened meanwhile; the index is dropped.
    pub fn install_index(&self, generation: u64, index: Arc<SearchIndex>) -> bool {
        let mut current = self.current.write();
        if current.generation != generation {
            return false;
        }
        *current = Arc::new(Dataset {
            generation,
            store: current.store.clone(),
            index: Some(index),
        });
        true
    }
}
