use smallvec::{smallvec, SmallVec};
use tracing::debug;

use crate::storage::adjacency::{EdgeRowKey, RowValue};
use crate::storage::edge::{Edge, EdgeLoader};
use crate::storage::kv::Row;
use crate::types::{Direction, EdgeId, ElementKind, GraphError, Result};

use super::{Core, Graph};

/// One index row, decoded.
pub(super) struct DecodedRow {
    pub fields: EdgeRowKey,
    pub created_at: i64,
    pub ts: u64,
}

/// An index row whose edge or endpoint no longer exists.
#[derive(Debug)]
pub(super) struct StaleRow {
    pub edge: EdgeId,
    pub missing: ElementKind,
    pub missing_id: u64,
    /// Rows to remove: the one that was read and its other-direction twin.
    pub rows: SmallVec<[EdgeRowKey; 2]>,
    /// Write timestamp bounding the removal.
    pub ts: u64,
}

pub(super) enum Resolution {
    Found(Edge),
    Stale(StaleRow),
}

impl Graph {
    pub(super) fn decode_row(&self, row: &Row) -> Result<DecodedRow> {
        let fields = EdgeRowKey::decode(&row.key)?;
        let created_at = RowValue::decode(&row.value)?.created_at;
        self.core.metrics.row_decoded();
        Ok(DecodedRow {
            fields,
            created_at,
            ts: row.ts,
        })
    }

    /// Merges a decoded row onto the canonical edge and, when `load` is set,
    /// hydrates it and checks that both endpoints exist.
    pub(super) fn resolve(&self, row: DecodedRow, load: bool) -> Result<Resolution> {
        let DecodedRow {
            fields,
            created_at,
            ts,
        } = row;
        let identity = &self.core.identity;
        let edge = identity.find_or_create_edge(fields.edge);
        edge.merge(&fields, created_at, ts);
        identity.find_or_create_vertex(fields.owner);
        identity.find_or_create_vertex(fields.counterpart);
        if !load {
            return Ok(Resolution::Found(edge));
        }
        match self.load_checked(&edge)? {
            None => Ok(Resolution::Found(edge)),
            Some((missing, missing_id)) => {
                if missing == ElementKind::Edge {
                    edge.mark_missing();
                    identity.forget_edge(fields.edge);
                }
                let twin = twin_row(&fields);
                Ok(Resolution::Stale(StaleRow {
                    edge: fields.edge,
                    missing,
                    missing_id,
                    rows: smallvec![fields, twin],
                    ts,
                }))
            }
        }
    }

    /// Reloads the primary record and verifies both endpoints.
    ///
    /// Returns the first element found missing.
    fn load_checked(&self, edge: &Edge) -> Result<Option<(ElementKind, u64)>> {
        let elements = &self.core.elements;
        match elements.load_edge(edge.id())? {
            Some(record) => edge.apply_record(&record),
            None => return Ok(Some((ElementKind::Edge, edge.id().0))),
        }
        for vertex in [edge.out_vertex(), edge.in_vertex()].into_iter().flatten() {
            if !elements.vertex_exists(vertex)? {
                return Ok(Some((ElementKind::Vertex, vertex.0)));
            }
        }
        Ok(None)
    }

    /// Loads the full property bag of a lazily decoded edge.
    ///
    /// [`Edge::property`] does this on first use; calling it directly
    /// surfaces load errors. A missing primary record repairs the row the
    /// edge was decoded from and returns [`GraphError::NotFound`].
    pub fn hydrate_edge(&self, edge: &Edge) -> Result<()> {
        self.core.hydrate(edge)
    }
}

impl EdgeLoader for Core {
    fn hydrate(&self, edge: &Edge) -> Result<()> {
        if edge.is_loaded() {
            return Ok(());
        }
        let not_found = GraphError::NotFound {
            kind: ElementKind::Edge,
            id: edge.id().0,
        };
        if edge.is_missing() {
            return Err(not_found);
        }
        if let Some(record) = self.elements.load_edge(edge.id())? {
            edge.apply_record(&record);
            return Ok(());
        }
        debug!(edge = %edge.id(), "edge_index.hydrate.missing");
        edge.mark_missing();
        if let Some(stale) = stale_from_edge(edge, ElementKind::Edge, edge.id().0) {
            self.repair(&stale);
        }
        self.identity.forget_edge(edge.id());
        Err(not_found)
    }
}

/// The same index entry filed under the other endpoint.
fn twin_row(fields: &EdgeRowKey) -> EdgeRowKey {
    let direction = match fields.direction {
        Direction::In => Direction::Out,
        _ => Direction::In,
    };
    EdgeRowKey {
        owner: fields.counterpart,
        direction,
        counterpart: fields.owner,
        ..fields.clone()
    }
}

/// The row an edge was last decoded from, paired with its twin.
pub(super) fn stale_from_edge(edge: &Edge, missing: ElementKind, missing_id: u64) -> Option<StaleRow> {
    let (row, ts) = edge.source_row()?;
    let twin = twin_row(&row);
    Some(StaleRow {
        edge: edge.id(),
        missing,
        missing_id,
        rows: smallvec![row, twin],
        ts,
    })
}
