use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::types::{IndexKey, IndexMetadata, IndexScope, OperationType};

/// Lookup interface over declared secondary indices.
pub trait IndexRegistry: Send + Sync {
    /// Indices on `label` covering any of `keys` that are enabled for `op`.
    fn indices(
        &self,
        op: OperationType,
        scope: IndexScope,
        label: &str,
        keys: &[&str],
    ) -> Vec<IndexMetadata>;

    /// Whether an index on `(label, key)` is enabled for `op`.
    fn has_index(&self, op: OperationType, scope: IndexScope, label: &str, key: &str) -> bool;
}

/// In-memory catalog of index definitions.
#[derive(Default)]
pub struct IndexCatalog {
    entries: RwLock<FxHashMap<IndexKey, IndexMetadata>>,
}

impl IndexCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an index that is immediately readable and writable.
    ///
    /// Existing rows are not backfilled; callers index pre-existing edges
    /// explicitly.
    pub fn declare(&self, key: IndexKey) -> IndexMetadata {
        self.insert(key, true)
    }

    /// Declares an index that mutations maintain but queries ignore until
    /// [`IndexCatalog::activate`] is called.
    pub fn declare_building(&self, key: IndexKey) -> IndexMetadata {
        self.insert(key, false)
    }

    fn insert(&self, key: IndexKey, readable: bool) -> IndexMetadata {
        let meta = IndexMetadata {
            key: key.clone(),
            readable,
            writable: true,
        };
        debug!(index = %key, readable, "index_catalog.declare");
        self.entries.write().insert(key, meta.clone());
        meta
    }

    /// Makes a building index readable. Returns false if it is not declared.
    pub fn activate(&self, key: &IndexKey) -> bool {
        match self.entries.write().get_mut(key) {
            Some(meta) => {
                meta.readable = true;
                debug!(index = %key, "index_catalog.activate");
                true
            }
            None => false,
        }
    }

    /// Removes an index definition; its rows become unreachable by queries.
    pub fn drop_index(&self, key: &IndexKey) -> Option<IndexMetadata> {
        let removed = self.entries.write().remove(key);
        debug!(index = %key, existed = removed.is_some(), "index_catalog.drop");
        removed
    }

    pub fn get(&self, key: &IndexKey) -> Option<IndexMetadata> {
        self.entries.read().get(key).cloned()
    }

    /// All definitions, sorted by key.
    pub fn list(&self) -> Vec<IndexMetadata> {
        let mut all: Vec<IndexMetadata> = self.entries.read().values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }
}

impl IndexRegistry for IndexCatalog {
    fn indices(
        &self,
        op: OperationType,
        scope: IndexScope,
        label: &str,
        keys: &[&str],
    ) -> Vec<IndexMetadata> {
        let entries = self.entries.read();
        let mut found: Vec<IndexMetadata> = keys
            .iter()
            .filter_map(|key| entries.get(&IndexKey::new(scope, label, *key)))
            .filter(|meta| meta.enabled_for(op))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        found.dedup_by(|a, b| a.key == b.key);
        found
    }

    fn has_index(&self, op: OperationType, scope: IndexScope, label: &str, key: &str) -> bool {
        self.entries
            .read()
            .get(&IndexKey::new(scope, label, key))
            .is_some_and(|meta| meta.enabled_for(op))
    }
}
