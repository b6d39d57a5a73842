//! Canonical in-memory vertex handle and its adjacency cache.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::types::{Direction, VertexId};

use super::edge::Edge;

/// Signature of an adjacency query, one variant per query shape.
///
/// Property values and bounds are held in their encoded form, which is
/// canonical for equal values.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdjacencyKey {
    /// Every edge in a direction.
    Direction(Direction),
    /// Edges carrying any of the labels; sorted and deduplicated.
    Labels(Direction, Vec<String>),
    /// Edges whose property equals a value.
    Value {
        direction: Direction,
        label: String,
        key: String,
        value: Vec<u8>,
    },
    /// Edges whose property lies in `[from, to)`.
    Range {
        direction: Direction,
        label: String,
        key: String,
        from: Vec<u8>,
        to: Vec<u8>,
    },
}

impl AdjacencyKey {
    /// Key for a label-set query; an empty set means all labels.
    pub fn labels(direction: Direction, labels: &[String]) -> Self {
        if labels.is_empty() {
            return AdjacencyKey::Direction(direction);
        }
        let mut sorted = labels.to_vec();
        sorted.sort();
        sorted.dedup();
        AdjacencyKey::Labels(direction, sorted)
    }
}

type EdgeCache = LruCache<AdjacencyKey, Arc<[Edge]>>;

struct CacheSlot {
    entries: Option<EdgeCache>,
    /// Bumped by every invalidation.
    generation: u64,
}

struct VertexInner {
    id: VertexId,
    cache: Mutex<CacheSlot>,
}

/// Shared handle to the canonical instance of a vertex.
#[derive(Clone)]
pub struct Vertex(Arc<VertexInner>);

impl Vertex {
    /// Creates a vertex whose cache keeps at most `cache_capacity` query
    /// results; zero disables caching.
    pub(crate) fn new(id: VertexId, cache_capacity: usize) -> Self {
        let entries = NonZeroUsize::new(cache_capacity).map(LruCache::new);
        Vertex(Arc::new(VertexInner {
            id,
            cache: Mutex::new(CacheSlot {
                entries,
                generation: 0,
            }),
        }))
    }

    /// Vertex identity.
    pub fn id(&self) -> VertexId {
        self.0.id
    }

    /// Cached result of a completed query.
    pub fn edges_from_cache(&self, key: &AdjacencyKey) -> Option<Arc<[Edge]>> {
        self.0.cache.lock().entries.as_mut()?.get(key).cloned()
    }

    /// Current cache generation. A query result computed under an older
    /// generation predates a write and is not cached.
    pub fn cache_generation(&self) -> u64 {
        self.0.cache.lock().generation
    }

    /// Stores the complete result of a query started at `generation`.
    /// Returns false when an invalidation has happened since.
    pub fn cache_edges(&self, key: AdjacencyKey, edges: Vec<Edge>, generation: u64) -> bool {
        let mut slot = self.0.cache.lock();
        if slot.generation != generation {
            return false;
        }
        if let Some(cache) = slot.entries.as_mut() {
            cache.put(key, edges.into());
        }
        true
    }

    /// Drops every cached query result.
    pub fn invalidate_edge_cache(&self) {
        let mut slot = self.0.cache.lock();
        slot.generation += 1;
        if let Some(cache) = slot.entries.as_mut() {
            cache.clear();
        }
    }

    /// Number of cached query results.
    pub fn cached_queries(&self) -> usize {
        self.0.cache.lock().entries.as_ref().map_or(0, |cache| cache.len())
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Vertex {}

impl fmt::Debug for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vertex").field("id", &self.0.id).finish()
    }
}
