use smallvec::SmallVec;
use tracing::debug;

use crate::storage::adjacency::{EdgeRowKey, RowValue, CREATED_AT};
use crate::storage::edge::Edge;
use crate::storage::elements::EdgeRecord;
use crate::storage::index::{IndexKey, IndexScope, OperationType};
use crate::storage::kv::Mutation;
use crate::storage::props::PropValue;
use crate::types::{Direction, GraphError, Result};

use super::Graph;

const DIRECTIONS: [Direction; 2] = [Direction::Out, Direction::In];

impl Graph {
    /// Writes the primary rows of an edge plus a row for every write-enabled
    /// secondary index whose property the edge carries.
    ///
    /// Rows are applied in one unatomic batch; a failure can leave a subset
    /// written, which readers repair.
    pub fn write_edge_endpoints(&self, edge: &Edge) -> Result<()> {
        let record = self.current_record(edge)?;
        let value = RowValue {
            created_at: record.created_at,
        }
        .encode();
        let mut mutations = Vec::new();
        for key in self.indexed_keys(&record) {
            for row in index_rows(&record, &key) {
                mutations.push(Mutation::Put {
                    key: row.encode()?,
                    value: value.clone(),
                });
            }
        }
        debug!(edge = %record.id, rows = mutations.len(), "edge_index.write_endpoints");
        self.core.store.apply(mutations)?;
        self.core.invalidate(&[record.out_vertex, record.in_vertex]);
        Ok(())
    }

    /// Removes every row [`Graph::write_edge_endpoints`] would write for the
    /// edge's primary record, or for its known state when the record is gone.
    pub fn delete_edge_endpoints(&self, edge: &Edge) -> Result<()> {
        let record = self.current_record(edge)?;
        let mut mutations = Vec::new();
        for key in self.indexed_keys(&record) {
            for row in index_rows(&record, &key) {
                mutations.push(Mutation::Delete {
                    key: row.encode()?,
                    up_to: None,
                });
            }
        }
        debug!(edge = %record.id, rows = mutations.len(), "edge_index.delete_endpoints");
        self.core.store.apply(mutations)?;
        self.core.invalidate(&[record.out_vertex, record.in_vertex]);
        Ok(())
    }

    /// Writes the rows of one index for an edge, e.g. to backfill an index
    /// declared after the edge was created. An edge without the property
    /// gets no row.
    pub fn write_edge_index(&self, edge: &Edge, index: &IndexKey) -> Result<()> {
        check_scope(index)?;
        let record = self.current_record(edge)?;
        let rows = index_rows(&record, &index.property_key);
        if rows.is_empty() {
            debug!(edge = %record.id, index = %index, "edge_index.write_index.skip");
            return Ok(());
        }
        let value = RowValue {
            created_at: record.created_at,
        }
        .encode();
        let mut mutations = Vec::with_capacity(rows.len());
        for row in rows {
            mutations.push(Mutation::Put {
                key: row.encode()?,
                value: value.clone(),
            });
        }
        self.core.store.apply(mutations)?;
        self.core.invalidate(&[record.out_vertex, record.in_vertex]);
        Ok(())
    }

    /// Removes the rows of one index for an edge, sparing any row written
    /// after `ts`.
    pub fn delete_edge_index(&self, edge: &Edge, index: &IndexKey, ts: u64) -> Result<()> {
        check_scope(index)?;
        let record = self.current_record(edge)?;
        let rows = index_rows(&record, &index.property_key);
        self.core.delete_rows(&rows, Some(ts))
    }

    /// Stores the primary record of a new edge and writes its index rows.
    pub fn add_edge(&self, record: EdgeRecord) -> Result<Edge> {
        let edge = self.core.identity.find_or_create_edge(record.id);
        edge.apply_record(&record);
        self.core.elements.put_edge(record)?;
        self.write_edge_endpoints(&edge)?;
        Ok(edge)
    }

    /// Deletes an edge's index rows and then its primary record.
    pub fn remove_edge(&self, edge: &Edge) -> Result<()> {
        self.delete_edge_endpoints(edge)?;
        self.core.elements.delete_edge(edge.id())?;
        self.core.identity.forget_edge(edge.id());
        Ok(())
    }

    /// The edge as a primary record, loading it first when the instance
    /// only holds what index rows revealed.
    fn current_record(&self, edge: &Edge) -> Result<EdgeRecord> {
        if !edge.is_loaded() {
            if let Some(record) = self.core.elements.load_edge(edge.id())? {
                edge.apply_record(&record);
            }
        }
        edge.to_record()
    }

    fn indexed_keys(&self, record: &EdgeRecord) -> Vec<String> {
        let props: Vec<&str> = record.props.keys().map(String::as_str).collect();
        let mut keys = vec![CREATED_AT.to_owned()];
        keys.extend(
            self.indices
                .indices(OperationType::Write, IndexScope::Edge, &record.label, &props)
                .into_iter()
                .map(|meta| meta.key.property_key)
                .filter(|key| key != CREATED_AT),
        );
        keys
    }
}

fn check_scope(index: &IndexKey) -> Result<()> {
    match index.scope {
        IndexScope::Edge => Ok(()),
        IndexScope::Vertex => Err(GraphError::invalid(format!(
            "{index} is not an edge index"
        ))),
    }
}

/// Value an edge contributes to the index on `key`.
pub(super) fn index_value(record: &EdgeRecord, key: &str) -> Option<PropValue> {
    if key == CREATED_AT {
        return Some(PropValue::Int(record.created_at));
    }
    record.props.get(key).cloned()
}

/// Both direction rows of the index on `key`, empty if the edge lacks it.
pub(super) fn index_rows(record: &EdgeRecord, key: &str) -> SmallVec<[EdgeRowKey; 2]> {
    let Some(value) = index_value(record, key) else {
        return SmallVec::new();
    };
    DIRECTIONS
        .iter()
        .map(|dir| {
            EdgeRowKey::for_edge(
                record.id,
                &record.label,
                record.out_vertex,
                record.in_vertex,
                *dir,
                key,
                value.clone(),
            )
        })
        .collect()
}
