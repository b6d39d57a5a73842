use std::sync::Weak;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::types::{EdgeId, VertexId};

use super::edge::{Edge, EdgeLoader};
use super::vertex::Vertex;

/// Per-session registry of canonical vertex and edge instances.
///
/// Lookups are sharded by id so concurrent decoders rarely contend.
pub struct IdentityMap {
    vertices: Vec<Mutex<FxHashMap<VertexId, Vertex>>>,
    edges: Vec<Mutex<FxHashMap<EdgeId, Edge>>>,
    cache_capacity: usize,
    loader: Weak<dyn EdgeLoader>,
}

impl IdentityMap {
    pub(crate) fn new(shards: usize, cache_capacity: usize, loader: Weak<dyn EdgeLoader>) -> Self {
        let shard_count = shards.max(1);
        Self {
            vertices: (0..shard_count).map(|_| Mutex::default()).collect(),
            edges: (0..shard_count).map(|_| Mutex::default()).collect(),
            cache_capacity,
            loader,
        }
    }

    /// Returns the canonical vertex for `id`, creating it if unseen.
    pub fn find_or_create_vertex(&self, id: VertexId) -> Vertex {
        let mut shard = self.vertices[self.shard(id.0)].lock();
        shard
            .entry(id)
            .or_insert_with(|| Vertex::new(id, self.cache_capacity))
            .clone()
    }

    /// Returns the canonical edge for `id`, creating an empty one if unseen.
    /// New edges load their primary record through the session on demand.
    pub fn find_or_create_edge(&self, id: EdgeId) -> Edge {
        let mut shard = self.edges[self.shard(id.0)].lock();
        shard
            .entry(id)
            .or_insert_with(|| Edge::with_loader(id, Some(self.loader.clone())))
            .clone()
    }

    /// Canonical vertex for `id`, if one was created.
    pub fn vertex(&self, id: VertexId) -> Option<Vertex> {
        self.vertices[self.shard(id.0)].lock().get(&id).cloned()
    }

    /// Canonical edge for `id`, if one is live.
    pub fn edge(&self, id: EdgeId) -> Option<Edge> {
        self.edges[self.shard(id.0)].lock().get(&id).cloned()
    }

    /// Forgets a removed edge so a later edge reusing the id starts clean.
    pub(crate) fn forget_edge(&self, id: EdgeId) {
        self.edges[self.shard(id.0)].lock().remove(&id);
    }

    fn shard(&self, raw: u64) -> usize {
        (raw as usize) % self.vertices.len()
    }
}
