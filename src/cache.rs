//! Shared cache of decoded spatial index blocks.
//!
//! The cache is caller-owned and explicitly passed into queries — never a
//! process-global.  It is the one component deliberately shared across
//! concurrent queries, so it carries its own locking; nothing here assumes
//! cache operations are contention-free.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::feature::MapObject;

/// Identity of one cacheable decoded chunk: the owning archive's runtime
/// key plus the chunk's byte offset within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DataBlockId {
    pub archive: u64,
    pub offset:  u64,
}

/// One decoded spatial index block.
#[derive(Debug)]
pub struct DataBlock {
    pub id:      DataBlockId,
    pub objects: Vec<Arc<MapObject>>,
}

/// Mutex-guarded block map, shared by reference across queries.
#[derive(Debug, Default)]
pub struct SharedBlocksCache {
    inner: Mutex<HashMap<DataBlockId, Arc<DataBlock>>>,
}

impl SharedBlocksCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DataBlockId, Arc<DataBlock>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, id: &DataBlockId) -> Option<Arc<DataBlock>> {
        self.lock().get(id).cloned()
    }

    pub fn put(&self, block: Arc<DataBlock>) {
        self.lock().insert(block.id, block);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Evict every block not in `keep`.  Callers feed this the referenced
    /// block ids returned by a query to bound the cache to what the last
    /// viewport actually touched.
    pub fn retain_only(&self, keep: &HashSet<DataBlockId>) {
        self.lock().retain(|id, _| keep.contains(id));
    }
}
