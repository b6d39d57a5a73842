use std::sync::{Arc, Weak};

use crate::types::VertexId;

use super::edge::EdgeLoader;
use super::elements::ElementStore;
use super::identity::IdentityMap;
use super::index::IndexRegistry;
use super::kv::OrderedStore;
use super::metrics::{self, IndexMetrics};
use super::options::GraphOptions;
use super::vertex::Vertex;

mod adjacency_ops;
mod edge_ops;
mod index_ops;
mod repair;

pub use adjacency_ops::{EdgeIter, VertexIter};

/// Graph session tying the edge index to its collaborators.
///
/// The session owns the identity map, so canonical instances and their
/// adjacency caches live exactly as long as the `Graph`.
pub struct Graph {
    core: Arc<Core>,
    indices: Arc<dyn IndexRegistry>,
    opts: GraphOptions,
}

/// State shared between a session and the edges it hands out. Edges hold it
/// weakly to load their primary record on first property access.
struct Core {
    store: Arc<dyn OrderedStore>,
    elements: Arc<dyn ElementStore>,
    identity: IdentityMap,
    metrics: Arc<dyn IndexMetrics>,
}

impl Graph {
    /// Opens a session over the given store, element storage and index registry.
    pub fn open(
        store: Arc<dyn OrderedStore>,
        elements: Arc<dyn ElementStore>,
        indices: Arc<dyn IndexRegistry>,
        opts: GraphOptions,
    ) -> Self {
        Self::assemble(store, elements, indices, opts, metrics::default_metrics())
    }

    /// Replaces the metrics sink. Meant to be chained onto [`Graph::open`]:
    /// the session restarts with an empty identity map.
    pub fn with_metrics(self, metrics: Arc<dyn IndexMetrics>) -> Self {
        let Graph { core, indices, opts } = self;
        Self::assemble(
            core.store.clone(),
            core.elements.clone(),
            indices,
            opts,
            metrics,
        )
    }

    fn assemble(
        store: Arc<dyn OrderedStore>,
        elements: Arc<dyn ElementStore>,
        indices: Arc<dyn IndexRegistry>,
        opts: GraphOptions,
        metrics: Arc<dyn IndexMetrics>,
    ) -> Self {
        let core = Arc::new_cyclic(|core: &Weak<Core>| {
            let loader: Weak<dyn EdgeLoader> = core.clone();
            Core {
                store,
                elements,
                identity: IdentityMap::new(
                    opts.identity_shards,
                    opts.adjacency_cache_capacity,
                    loader,
                ),
                metrics,
            }
        });
        Self {
            core,
            indices,
            opts,
        }
    }

    /// Whether decoded edges skip primary-record loading.
    pub fn is_lazy_loading(&self) -> bool {
        self.opts.lazy_loading
    }

    /// Canonical instances of this session.
    pub fn identity(&self) -> &IdentityMap {
        &self.core.identity
    }

    /// Canonical instance of a vertex.
    pub fn vertex(&self, id: VertexId) -> Vertex {
        self.core.identity.find_or_create_vertex(id)
    }
}

impl Core {
    /// Drops cached adjacency of the given vertices, if instantiated.
    fn invalidate(&self, vertices: &[VertexId]) {
        for id in vertices {
            if let Some(vertex) = self.identity.vertex(*id) {
                vertex.invalidate_edge_cache();
            }
        }
    }
}
