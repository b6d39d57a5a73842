//! Canonical in-memory edge handle.
//!
//! Each edge id maps to one [`Edge`] per session (see
//! [`super::identity::IdentityMap`]). Rows decoded from different indices
//! merge onto that instance: structural fields are set once, properties
//! accumulate, and a primary-record load replaces the bag wholesale.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::types::{Direction, EdgeId, GraphError, Result, VertexId};

use super::adjacency::EdgeRowKey;
use super::elements::EdgeRecord;
use super::index::IndexKey;
use super::props::PropValue;

/// Fields that identify an edge's place in the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeStructure {
    /// Edge label.
    pub label: String,
    /// Creation timestamp.
    pub created_at: i64,
    /// Tail vertex.
    pub out_vertex: VertexId,
    /// Head vertex.
    pub in_vertex: VertexId,
}

/// Loads primary records into edges that were decoded without one.
pub(crate) trait EdgeLoader: Send + Sync {
    /// Fills `edge` from its primary record. A missing record repairs the row
    /// the edge was decoded from and fails with [`GraphError::NotFound`].
    fn hydrate(&self, edge: &Edge) -> Result<()>;
}

#[derive(Default)]
struct EdgeState {
    structure: Option<EdgeStructure>,
    props: BTreeMap<String, PropValue>,
    loaded: bool,
    /// Primary record found missing on load.
    missing: bool,
    /// Row this edge was last decoded from, with its write timestamp.
    source: Option<(EdgeRowKey, u64)>,
}

struct EdgeInner {
    id: EdgeId,
    loader: Option<Weak<dyn EdgeLoader>>,
    state: RwLock<EdgeState>,
}

/// Shared handle to the canonical instance of an edge.
///
/// Edges handed out by a lazy session load their primary record on the
/// first [`Edge::property`] or [`Edge::properties`] call, as long as the
/// session is still open.
#[derive(Clone)]
pub struct Edge(Arc<EdgeInner>);

impl Edge {
    /// A standalone edge with no session to load from.
    pub(crate) fn new(id: EdgeId) -> Self {
        Self::with_loader(id, None)
    }

    pub(crate) fn with_loader(id: EdgeId, loader: Option<Weak<dyn EdgeLoader>>) -> Self {
        Edge(Arc::new(EdgeInner {
            id,
            loader,
            state: RwLock::new(EdgeState::default()),
        }))
    }

    /// Edge identity.
    pub fn id(&self) -> EdgeId {
        self.0.id
    }

    /// Structural fields, once any row or record has been merged.
    pub fn structure(&self) -> Option<EdgeStructure> {
        self.0.state.read().structure.clone()
    }

    /// Edge label, once known.
    pub fn label(&self) -> Option<String> {
        self.0.state.read().structure.as_ref().map(|s| s.label.clone())
    }

    /// Creation timestamp, once known.
    pub fn created_at(&self) -> Option<i64> {
        self.0.state.read().structure.as_ref().map(|s| s.created_at)
    }

    /// Tail vertex, once known.
    pub fn out_vertex(&self) -> Option<VertexId> {
        self.0.state.read().structure.as_ref().map(|s| s.out_vertex)
    }

    /// Head vertex, once known.
    pub fn in_vertex(&self) -> Option<VertexId> {
        self.0.state.read().structure.as_ref().map(|s| s.in_vertex)
    }

    /// Endpoint opposite to `vertex`. A self-loop returns `vertex` itself.
    pub fn other_end(&self, vertex: VertexId) -> Option<VertexId> {
        let state = self.0.state.read();
        let s = state.structure.as_ref()?;
        Some(if s.in_vertex == vertex {
            s.out_vertex
        } else {
            s.in_vertex
        })
    }

    /// Endpoint an index row of the given direction is filed under.
    pub fn endpoint(&self, direction: Direction) -> Option<VertexId> {
        match direction {
            Direction::Out => self.out_vertex(),
            Direction::In => self.in_vertex(),
            Direction::Both => None,
        }
    }

    /// A single property, loading the primary record first if needed.
    pub fn property(&self, key: &str) -> Option<PropValue> {
        self.ensure_loaded();
        self.0.state.read().props.get(key).cloned()
    }

    /// All properties, loading the primary record first if needed. Falls
    /// back to what index rows revealed when no record can be loaded.
    pub fn properties(&self) -> BTreeMap<String, PropValue> {
        self.ensure_loaded();
        self.0.state.read().props.clone()
    }

    /// Whether the primary record has been loaded into this instance.
    pub fn is_loaded(&self) -> bool {
        self.0.state.read().loaded
    }

    /// Index and write timestamp of the row this edge was last decoded from.
    pub fn index_ref(&self) -> Option<(IndexKey, u64)> {
        let state = self.0.state.read();
        let (row, ts) = state.source.as_ref()?;
        Some((IndexKey::edge(&row.label, &row.key), *ts))
    }

    /// Exact row this edge was last decoded from.
    pub(crate) fn source_row(&self) -> Option<(EdgeRowKey, u64)> {
        self.0.state.read().source.clone()
    }

    pub(crate) fn is_missing(&self) -> bool {
        self.0.state.read().missing
    }

    pub(crate) fn mark_missing(&self) {
        self.0.state.write().missing = true;
    }

    fn ensure_loaded(&self) {
        {
            let state = self.0.state.read();
            if state.loaded || state.missing {
                return;
            }
        }
        let Some(loader) = self.0.loader.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        if let Err(err) = loader.hydrate(self) {
            debug!(edge = %self.0.id, error = %err, "edge.load_failed");
        }
    }

    /// Merges what one decoded row says about the edge.
    pub(crate) fn merge(&self, row: &EdgeRowKey, created_at: i64, ts: u64) {
        let mut state = self.0.state.write();
        Self::merge_structure(
            self.0.id,
            &mut state,
            EdgeStructure {
                label: row.label.clone(),
                created_at,
                out_vertex: row.out_vertex(),
                in_vertex: row.in_vertex(),
            },
        );
        if !row.is_primary() {
            state
                .props
                .entry(row.key.clone())
                .or_insert_with(|| row.value.clone());
        }
        state.source = Some((row.clone(), ts));
    }

    pub(crate) fn apply_record(&self, record: &EdgeRecord) {
        let mut state = self.0.state.write();
        Self::merge_structure(
            self.0.id,
            &mut state,
            EdgeStructure {
                label: record.label.clone(),
                created_at: record.created_at,
                out_vertex: record.out_vertex,
                in_vertex: record.in_vertex,
            },
        );
        state.props = record.props.clone();
        state.loaded = true;
        state.missing = false;
    }

    fn merge_structure(id: EdgeId, state: &mut EdgeState, incoming: EdgeStructure) {
        match &state.structure {
            None => state.structure = Some(incoming),
            Some(existing) if *existing != incoming => {
                warn!(
                    edge = %id,
                    existing = ?existing,
                    incoming = ?incoming,
                    "edge.structure_conflict"
                );
            }
            Some(_) => {}
        }
    }

    /// Current state as a primary record; fails if no structure is known yet.
    pub(crate) fn to_record(&self) -> Result<EdgeRecord> {
        let state = self.0.state.read();
        let s = state.structure.as_ref().ok_or_else(|| {
            GraphError::invalid(format!("edge {} has no known structure", self.0.id))
        })?;
        Ok(EdgeRecord {
            id: self.0.id,
            label: s.label.clone(),
            out_vertex: s.out_vertex,
            in_vertex: s.in_vertex,
            created_at: s.created_at,
            props: state.props.clone(),
        })
    }

    #[cfg(test)]
    pub(crate) fn ptr_eq(&self, other: &Edge) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.read();
        f.debug_struct("Edge")
            .field("id", &self.0.id)
            .field("structure", &state.structure)
            .field("loaded", &state.loaded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::storage::adjacency::CREATED_AT;

    fn row(key: &str, value: PropValue, label: &str) -> EdgeRowKey {
        EdgeRowKey::for_edge(
            EdgeId(7),
            label,
            VertexId(1),
            VertexId(2),
            Direction::Out,
            key,
            value,
        )
    }

    fn since_2020() -> EdgeRecord {
        EdgeRecord {
            id: EdgeId(7),
            label: "knows".into(),
            out_vertex: VertexId(1),
            in_vertex: VertexId(2),
            created_at: 10,
            props: BTreeMap::from([("since".to_string(), PropValue::Int(2020))]),
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        calls: AtomicUsize,
    }

    impl EdgeLoader for CountingLoader {
        fn hydrate(&self, edge: &Edge) -> Result<()> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            edge.apply_record(&since_2020());
            Ok(())
        }
    }

    #[test]
    fn merge_accumulates_properties_and_keeps_first_structure() {
        let edge = Edge::new(EdgeId(7));
        edge.merge(&row(CREATED_AT, PropValue::Int(10), "knows"), 10, 3);
        edge.merge(&row("since", PropValue::Int(2020), "knows"), 10, 4);
        edge.merge(&row("weight", PropValue::Int(1), "likes"), 10, 5);
        assert_eq!(edge.label().as_deref(), Some("knows"));
        assert_eq!(edge.property("since"), Some(PropValue::Int(2020)));
        assert_eq!(edge.property(CREATED_AT), None);
        assert_eq!(edge.index_ref().map(|(_, ts)| ts), Some(5));
        assert!(!edge.is_loaded());
    }

    #[test]
    fn source_row_is_the_row_read_not_the_bag() {
        let edge = Edge::new(EdgeId(7));
        edge.merge(&row("since", PropValue::Int(1999), "knows"), 10, 1);
        let stale = row("since", PropValue::Int(2020), "knows");
        edge.merge(&stale, 10, 2);
        assert_eq!(edge.property("since"), Some(PropValue::Int(1999)));
        assert_eq!(edge.source_row(), Some((stale, 2)));
    }

    #[test]
    fn record_replaces_property_bag() {
        let edge = Edge::new(EdgeId(7));
        edge.merge(&row("since", PropValue::Int(1999), "knows"), 10, 1);
        edge.apply_record(&since_2020());
        assert!(edge.is_loaded());
        assert_eq!(edge.property("since"), Some(PropValue::Int(2020)));
        assert_eq!(edge.to_record().unwrap().props.len(), 1);
    }

    #[test]
    fn property_access_loads_once_through_the_loader() {
        let loader = Arc::new(CountingLoader::default());
        let weak: Weak<dyn EdgeLoader> = Arc::downgrade(&loader) as Weak<dyn EdgeLoader>;
        let edge = Edge::with_loader(EdgeId(7), Some(weak));
        edge.merge(&row(CREATED_AT, PropValue::Int(10), "knows"), 10, 1);
        assert!(!edge.is_loaded());

        assert_eq!(edge.property("since"), Some(PropValue::Int(2020)));
        assert_eq!(edge.properties().len(), 1);
        assert_eq!(loader.calls.load(Ordering::Relaxed), 1);

        let weak: Weak<dyn EdgeLoader> = Arc::downgrade(&loader) as Weak<dyn EdgeLoader>;
        let orphan = Edge::with_loader(EdgeId(8), Some(weak));
        drop(loader);
        assert_eq!(orphan.property("since"), None);
    }

    #[test]
    fn other_end_handles_both_sides_and_loops() {
        let edge = Edge::new(EdgeId(1));
        assert_eq!(edge.other_end(VertexId(1)), None);
        edge.merge(&row(CREATED_AT, PropValue::Int(10), "knows"), 10, 1);
        assert_eq!(edge.other_end(VertexId(1)), Some(VertexId(2)));
        assert_eq!(edge.other_end(VertexId(2)), Some(VertexId(1)));
        assert!(Edge::new(EdgeId(2)).to_record().is_err());
    }
}
