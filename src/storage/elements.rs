//! Primary element storage consumed by the edge index.
//!
//! Index rows only describe adjacency; full edge properties and vertex
//! existence live in primary storage, which is owned elsewhere. The trait is
//! what the decoder needs to hydrate edges and to notice stale references.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::types::{EdgeId, Result, VertexId};

use super::props::PropValue;

/// Primary record of an edge.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRecord {
    /// Edge identity.
    pub id: EdgeId,
    /// Edge label.
    pub label: String,
    /// Tail vertex.
    pub out_vertex: VertexId,
    /// Head vertex.
    pub in_vertex: VertexId,
    /// Creation timestamp.
    pub created_at: i64,
    /// Complete property bag.
    pub props: BTreeMap<String, PropValue>,
}

/// Read/write access to primary vertex and edge storage.
pub trait ElementStore: Send + Sync {
    /// Loads the primary record of an edge, `None` if it does not exist.
    fn load_edge(&self, id: EdgeId) -> Result<Option<EdgeRecord>>;

    /// Reports whether a vertex exists.
    fn vertex_exists(&self, id: VertexId) -> Result<bool>;

    /// Stores or replaces an edge record.
    fn put_edge(&self, record: EdgeRecord) -> Result<()>;

    /// Removes an edge record, returning whether it existed.
    fn delete_edge(&self, id: EdgeId) -> Result<bool>;
}

/// Hash-map backed [`ElementStore`].
#[derive(Default)]
pub struct MemElementStore {
    edges: RwLock<FxHashMap<EdgeId, EdgeRecord>>,
    vertices: RwLock<FxHashSet<VertexId>>,
}

impl MemElementStore {
    /// Creates an empty element store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a vertex.
    pub fn add_vertex(&self, id: VertexId) {
        self.vertices.write().insert(id);
    }

    /// Removes a vertex, returning whether it existed. Edges are left alone.
    pub fn remove_vertex(&self, id: VertexId) -> bool {
        self.vertices.write().remove(&id)
    }

    /// Number of stored edges.
    pub fn edge_count(&self) -> usize {
        self.edges.read().len()
    }
}

impl ElementStore for MemElementStore {
    fn load_edge(&self, id: EdgeId) -> Result<Option<EdgeRecord>> {
        Ok(self.edges.read().get(&id).cloned())
    }

    fn vertex_exists(&self, id: VertexId) -> Result<bool> {
        Ok(self.vertices.read().contains(&id))
    }

    fn put_edge(&self, record: EdgeRecord) -> Result<()> {
        self.edges.write().insert(record.id, record);
        Ok(())
    }

    fn delete_edge(&self, id: EdgeId) -> Result<bool> {
        Ok(self.edges.write().remove(&id).is_some())
    }
}
