use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::storage::edge::Edge;
use crate::storage::index::{IndexPlan, IndexSelector, PropertyPredicate};
use crate::storage::kv::{Row, RowStream, ScanSpec};
use crate::storage::props::{self, PropValue};
use crate::storage::scan;
use crate::storage::vertex::{AdjacencyKey, Vertex};
use crate::types::{Direction, EdgeId, ElementKind, GraphError, Result, VertexId};

use super::edge_ops::{stale_from_edge, Resolution};
use super::Graph;

impl Graph {
    /// Edges of `vertex` in `direction` carrying any of `labels` (all labels
    /// when empty), in row-key order.
    pub fn edges(
        &self,
        vertex: &Vertex,
        direction: Direction,
        labels: &[&str],
    ) -> Result<EdgeIter<'_>> {
        let labels: Vec<String> = labels.iter().map(|l| (*l).to_owned()).collect();
        let cache_key = AdjacencyKey::labels(direction, &labels);
        if let Some(hit) = self.cached(vertex, &cache_key) {
            return Ok(hit);
        }
        let spec = scan::labels_scan(vertex.id(), direction, &labels);
        self.start_scan(
            vertex,
            cache_key,
            IndexPlan::Primary,
            vec![spec],
            labels.is_empty(),
        )
    }

    /// Edges whose property `key` equals `value`.
    pub fn edges_by_value(
        &self,
        vertex: &Vertex,
        direction: Direction,
        label: &str,
        key: &str,
        value: &PropValue,
    ) -> Result<EdgeIter<'_>> {
        let encoded = props::encode_value(value)?;
        let cache_key = AdjacencyKey::Value {
            direction,
            label: label.to_owned(),
            key: key.to_owned(),
            value: encoded.clone(),
        };
        self.property_query(
            vertex,
            direction,
            label,
            key,
            PropertyPredicate::Equals(encoded),
            cache_key,
        )
    }

    /// Edges whose property `key` lies in `[from, to)`. Both bounds must have
    /// the same range-queryable type.
    pub fn edges_in_range(
        &self,
        vertex: &Vertex,
        direction: Direction,
        label: &str,
        key: &str,
        from: &PropValue,
        to: &PropValue,
    ) -> Result<EdgeIter<'_>> {
        let (from, to) = props::encode_range(from, to)?;
        let cache_key = AdjacencyKey::Range {
            direction,
            label: label.to_owned(),
            key: key.to_owned(),
            from: from.clone(),
            to: to.clone(),
        };
        self.property_query(
            vertex,
            direction,
            label,
            key,
            PropertyPredicate::Range { from, to },
            cache_key,
        )
    }

    /// Opposite endpoints of [`Graph::edges`], one per edge.
    pub fn vertices(
        &self,
        vertex: &Vertex,
        direction: Direction,
        labels: &[&str],
    ) -> Result<VertexIter<'_>> {
        let edges = self.edges(vertex, direction, labels)?;
        Ok(VertexIter::new(self, vertex.id(), edges))
    }

    /// Opposite endpoints of [`Graph::edges_by_value`].
    pub fn vertices_by_value(
        &self,
        vertex: &Vertex,
        direction: Direction,
        label: &str,
        key: &str,
        value: &PropValue,
    ) -> Result<VertexIter<'_>> {
        let edges = self.edges_by_value(vertex, direction, label, key, value)?;
        Ok(VertexIter::new(self, vertex.id(), edges))
    }

    /// Opposite endpoints of [`Graph::edges_in_range`].
    pub fn vertices_in_range(
        &self,
        vertex: &Vertex,
        direction: Direction,
        label: &str,
        key: &str,
        from: &PropValue,
        to: &PropValue,
    ) -> Result<VertexIter<'_>> {
        let edges = self.edges_in_range(vertex, direction, label, key, from, to)?;
        Ok(VertexIter::new(self, vertex.id(), edges))
    }

    fn property_query(
        &self,
        vertex: &Vertex,
        direction: Direction,
        label: &str,
        key: &str,
        predicate: PropertyPredicate,
        cache_key: AdjacencyKey,
    ) -> Result<EdgeIter<'_>> {
        if let Some(hit) = self.cached(vertex, &cache_key) {
            return Ok(hit);
        }
        let plan = IndexSelector::new(self.indices.as_ref()).select(label, Some((key, predicate)));
        let specs = scan::plan_scans(vertex.id(), direction, label, &plan);
        self.start_scan(vertex, cache_key, plan, specs, false)
    }

    fn cached(&self, vertex: &Vertex, key: &AdjacencyKey) -> Option<EdgeIter<'_>> {
        match vertex.edges_from_cache(key) {
            Some(edges) => {
                self.core.metrics.cache_hit();
                debug!(vertex = %vertex.id(), len = edges.len(), "edge_index.cache.hit");
                Some(EdgeIter {
                    graph: self,
                    inner: Inner::Cached { edges, pos: 0 },
                })
            }
            None => {
                self.core.metrics.cache_miss();
                None
            }
        }
    }

    /// Issues the first scan eagerly so store failures surface here; later
    /// scans of a multi-scan plan open as the iterator reaches them.
    fn start_scan(
        &self,
        vertex: &Vertex,
        cache_key: AdjacencyKey,
        plan: IndexPlan,
        specs: Vec<ScanSpec>,
        primary_only: bool,
    ) -> Result<EdgeIter<'_>> {
        let kind = plan.kind();
        let predicate = match plan {
            IndexPlan::Fallback {
                property_key,
                predicate,
            } => Some((property_key, predicate)),
            _ => None,
        };
        let generation = vertex.cache_generation();
        let mut pending: VecDeque<ScanSpec> = specs.into();
        let rows = match pending.pop_front() {
            Some(spec) => Some(self.open_scan(vertex.id(), &spec, kind)?),
            None => None,
        };
        Ok(EdgeIter {
            graph: self,
            inner: Inner::Scan(Box::new(ScanState {
                vertex: vertex.clone(),
                cache_key,
                generation,
                kind,
                pending,
                rows,
                primary_only,
                predicate,
                seen: FxHashSet::default(),
                collected: Vec::new(),
            })),
        })
    }

    fn open_scan(&self, vertex: VertexId, spec: &ScanSpec, kind: &'static str) -> Result<RowStream<'_>> {
        self.core.metrics.scan_issued(kind);
        debug!(
            %vertex,
            kind,
            filtered = spec.filter.is_some(),
            "edge_index.scan"
        );
        self.core.store.scan(spec)
    }
}

/// Lazy, single-pass sequence of edges produced by an adjacency query.
///
/// The vertex cache is populated only when the sequence is drained to its
/// natural end; dropping it early or hitting an error leaves the cache
/// untouched, and so does a write to the vertex's edges made while the
/// sequence was open.
pub struct EdgeIter<'g> {
    graph: &'g Graph,
    inner: Inner<'g>,
}

enum Inner<'g> {
    Cached { edges: Arc<[Edge]>, pos: usize },
    Scan(Box<ScanState<'g>>),
    Done,
}

struct ScanState<'g> {
    vertex: Vertex,
    cache_key: AdjacencyKey,
    /// Cache generation of `vertex` when the scan started.
    generation: u64,
    kind: &'static str,
    pending: VecDeque<ScanSpec>,
    rows: Option<RowStream<'g>>,
    /// Skip secondary rows that share the scanned prefix.
    primary_only: bool,
    /// Client-side test for plans without a usable secondary index.
    predicate: Option<(String, PropertyPredicate)>,
    seen: FxHashSet<EdgeId>,
    collected: Vec<Edge>,
}

enum Step {
    Yield(Edge),
    Complete,
    Failed(GraphError),
}

impl<'g> ScanState<'g> {
    fn advance(&mut self, graph: &'g Graph) -> Step {
        loop {
            if self.rows.is_none() {
                let Some(spec) = self.pending.pop_front() else {
                    self.on_complete();
                    return Step::Complete;
                };
                match graph.open_scan(self.vertex.id(), &spec, self.kind) {
                    Ok(rows) => self.rows = Some(rows),
                    Err(err) => return Step::Failed(err),
                }
            }
            let Some(rows) = self.rows.as_mut() else {
                continue;
            };
            let row = match rows.next() {
                Some(Ok(row)) => row,
                Some(Err(err)) => return Step::Failed(err),
                None => {
                    self.rows = None;
                    continue;
                }
            };
            match self.accept(graph, row) {
                Ok(Some(edge)) => return Step::Yield(edge),
                Ok(None) => {}
                Err(err) => return Step::Failed(err),
            }
        }
    }

    fn accept(&mut self, graph: &Graph, row: Row) -> Result<Option<Edge>> {
        let decoded = graph.decode_row(&row)?;
        if self.primary_only && !decoded.fields.is_primary() {
            trace!(edge = %decoded.fields.edge, key = %decoded.fields.key, "edge_index.skip_secondary");
            return Ok(None);
        }
        if !self.seen.insert(decoded.fields.edge) {
            return Ok(None);
        }
        let load = !graph.is_lazy_loading() || self.predicate.is_some();
        let edge = match graph.resolve(decoded, load)? {
            Resolution::Found(edge) => edge,
            Resolution::Stale(stale) => {
                graph.core.repair(&stale);
                return Ok(None);
            }
        };
        if let Some((key, predicate)) = &self.predicate {
            let passes = edge
                .property(key)
                .and_then(|value| props::encode_value(&value).ok())
                .is_some_and(|encoded| predicate.matches(&encoded));
            if !passes {
                graph.core.metrics.row_filtered();
                return Ok(None);
            }
        }
        self.collected.push(edge.clone());
        Ok(Some(edge))
    }

    fn on_complete(&mut self) {
        let edges = mem::take(&mut self.collected);
        let len = edges.len();
        if self
            .vertex
            .cache_edges(self.cache_key.clone(), edges, self.generation)
        {
            debug!(vertex = %self.vertex.id(), len, "edge_index.cache.populate");
        } else {
            debug!(vertex = %self.vertex.id(), "edge_index.cache.outdated");
        }
    }
}

impl Iterator for EdgeIter<'_> {
    type Item = Result<Edge>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = match &mut self.inner {
            Inner::Done => return None,
            Inner::Cached { edges, pos } => {
                let edge = edges.get(*pos)?.clone();
                *pos += 1;
                return Some(Ok(edge));
            }
            Inner::Scan(state) => state.advance(self.graph),
        };
        match step {
            Step::Yield(edge) => Some(Ok(edge)),
            Step::Complete => {
                self.inner = Inner::Done;
                None
            }
            Step::Failed(err) => {
                self.inner = Inner::Done;
                Some(Err(err))
            }
        }
    }
}

/// Opposite endpoints of an edge sequence.
pub struct VertexIter<'g> {
    graph: &'g Graph,
    origin: VertexId,
    edges: EdgeIter<'g>,
}

impl<'g> VertexIter<'g> {
    fn new(graph: &'g Graph, origin: VertexId, edges: EdgeIter<'g>) -> Self {
        Self {
            graph,
            origin,
            edges,
        }
    }
}

impl Iterator for VertexIter<'_> {
    type Item = Result<Vertex>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let edge = match self.edges.next()? {
                Ok(edge) => edge,
                Err(err) => return Some(Err(err)),
            };
            let Some(other) = edge.other_end(self.origin) else {
                continue;
            };
            if !self.graph.is_lazy_loading() {
                match self.graph.core.elements.vertex_exists(other) {
                    Ok(true) => {}
                    Ok(false) => {
                        if let Some(stale) = stale_from_edge(&edge, ElementKind::Vertex, other.0) {
                            self.graph.core.repair(&stale);
                        }
                        continue;
                    }
                    Err(err) => return Some(Err(err)),
                }
            }
            return Some(Ok(self.graph.core.identity.find_or_create_vertex(other)));
        }
    }
}
