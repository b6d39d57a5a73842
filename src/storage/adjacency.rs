//! Row key layout for edge index rows.
//!
//! Every row is keyed by the vertex that owns it:
//!
//! ```text
//! [salt:1][owner:8][dir:1][label:esc][key:esc][value:tagged][counterpart:8][edge:8]
//! ```
//!
//! The creation-time row uses [`CREATED_AT`] as its key and the creation
//! timestamp as its value; secondary index rows use the indexed property.
//! Read keys are the same layout truncated after any field, so a shorter read
//! key is a byte prefix of every row sharing its fields.

use xxhash_rust::xxh64::xxh64;

use crate::primitives::bytes::{buf::Cursor, ord};
use crate::types::{Direction, EdgeId, GraphError, Result, VertexId};

use super::props::{self, PropValue};

/// Property key of the mandatory by-creation-time row.
pub const CREATED_AT: &str = "~created_at";

pub const DIR_OUT: u8 = 0;
pub const DIR_IN: u8 = 1;

const ROW_VALUE_LEN: usize = 8;

/// Partition salt for a vertex id.
pub fn salt(vertex: VertexId) -> u8 {
    (xxh64(&vertex.0.to_be_bytes(), 0) & 0xFF) as u8
}

fn put_vertex(buf: &mut Vec<u8>, vertex: VertexId) {
    buf.push(salt(vertex));
    ord::put_u64(buf, vertex.0);
}

fn encode_dir(dir: Direction) -> Result<u8> {
    match dir {
        Direction::Out => Ok(DIR_OUT),
        Direction::In => Ok(DIR_IN),
        Direction::Both => Err(GraphError::invalid(
            "direction BOTH has no physical row encoding",
        )),
    }
}

fn decode_dir(byte: u8) -> Result<Direction> {
    match byte {
        DIR_OUT => Ok(Direction::Out),
        DIR_IN => Ok(Direction::In),
        other => Err(GraphError::corruption(format!(
            "unknown direction flag 0x{other:02x}"
        ))),
    }
}

/// Fully decoded fields of one edge index row key.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRowKey {
    /// Vertex the row is filed under.
    pub owner: VertexId,
    /// Direction of the edge relative to `owner`; never `Both`.
    pub direction: Direction,
    /// Edge label.
    pub label: String,
    /// Indexed property key, or [`CREATED_AT`] for the primary row.
    pub key: String,
    /// Indexed property value.
    pub value: PropValue,
    /// The other endpoint.
    pub counterpart: VertexId,
    /// Edge identity.
    pub edge: EdgeId,
}

impl EdgeRowKey {
    /// Builds the row key filed under the endpoint selected by `direction`.
    pub fn for_edge(
        edge: EdgeId,
        label: &str,
        out_vertex: VertexId,
        in_vertex: VertexId,
        direction: Direction,
        key: &str,
        value: PropValue,
    ) -> Self {
        let (owner, counterpart) = match direction {
            Direction::In => (in_vertex, out_vertex),
            _ => (out_vertex, in_vertex),
        };
        Self {
            owner,
            direction,
            label: label.to_owned(),
            key: key.to_owned(),
            value,
            counterpart,
            edge,
        }
    }

    /// Returns true for rows of the mandatory creation-time index.
    pub fn is_primary(&self) -> bool {
        self.key == CREATED_AT
    }

    /// The edge's out-vertex, recovered from the direction flag.
    pub fn out_vertex(&self) -> VertexId {
        match self.direction {
            Direction::In => self.counterpart,
            _ => self.owner,
        }
    }

    /// The edge's in-vertex, recovered from the direction flag.
    pub fn in_vertex(&self) -> VertexId {
        match self.direction {
            Direction::In => self.owner,
            _ => self.counterpart,
        }
    }

    /// Encodes the full write key.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(1 + 8 + 1 + self.label.len() + self.key.len() + 32);
        put_vertex(&mut buf, self.owner);
        buf.push(encode_dir(self.direction)?);
        ord::put_str(&mut buf, &self.label);
        ord::put_str(&mut buf, &self.key);
        props::put_value(&mut buf, &self.value)?;
        ord::put_u64(&mut buf, self.counterpart.0);
        ord::put_u64(&mut buf, self.edge.0);
        Ok(buf)
    }

    /// Decodes a write key, field by field in write order.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(bytes);
        let salt_byte = cur.u8()?;
        let owner = VertexId(cur.u64()?);
        if salt_byte != salt(owner) {
            return Err(GraphError::corruption(format!(
                "salt mismatch for vertex {owner}"
            )));
        }
        let direction = decode_dir(cur.u8()?)?;
        let label = cur.str()?;
        let key = cur.str()?;
        let value = props::read_value(&mut cur)?;
        let counterpart = VertexId(cur.u64()?);
        let edge = EdgeId(cur.u64()?);
        if cur.remaining() != 0 {
            return Err(GraphError::corruption("trailing bytes after edge row key"));
        }
        Ok(Self {
            owner,
            direction,
            label,
            key,
            value,
            counterpart,
            edge,
        })
    }
}

/// Scan-bound key truncated at the first absent field.
///
/// `Direction::Both` stops the key after the vertex, which covers both
/// directions.
#[derive(Clone, Copy, Debug)]
pub struct ReadKey<'a> {
    /// Vertex whose rows are read.
    pub vertex: VertexId,
    /// Direction; `Both` covers the whole vertex.
    pub direction: Direction,
    /// Optional label component.
    pub label: Option<&'a str>,
    /// Optional property key component, only used after a label.
    pub key: Option<&'a str>,
    /// Already-encoded property value (see [`props::encode_value`]).
    pub value: Option<&'a [u8]>,
}

impl<'a> ReadKey<'a> {
    /// Read key covering every row of `vertex` in `direction`.
    pub fn vertex(vertex: VertexId, direction: Direction) -> Self {
        Self {
            vertex,
            direction,
            label: None,
            key: None,
            value: None,
        }
    }

    /// Narrows the prefix to one label.
    pub fn label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    /// Narrows to one property key; ignored without a label.
    pub fn key(mut self, key: &'a str) -> Self {
        self.key = Some(key);
        self
    }

    /// Narrows to an already encoded property value; ignored without a key.
    pub fn value(mut self, value: &'a [u8]) -> Self {
        self.value = Some(value);
        self
    }

    /// Encodes the prefix, stopping at the first unset component.
    /// `Both` yields the vertex-only prefix covering both directions.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        put_vertex(&mut buf, self.vertex);
        let dir = match self.direction {
            Direction::Out => DIR_OUT,
            Direction::In => DIR_IN,
            Direction::Both => return buf,
        };
        buf.push(dir);
        let Some(label) = self.label else {
            return buf;
        };
        ord::put_str(&mut buf, label);
        let Some(key) = self.key else {
            return buf;
        };
        ord::put_str(&mut buf, key);
        if let Some(value) = self.value {
            buf.extend_from_slice(value);
        }
        buf
    }
}

/// Value area shared by every index row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RowValue {
    /// Creation timestamp of the edge the row describes.
    pub created_at: i64,
}

impl RowValue {
    /// Fixed-width, order-preserving encoding.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ROW_VALUE_LEN);
        ord::put_i64(&mut buf, self.created_at);
        buf
    }

    /// Fails with a corruption error on any length but the fixed one.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ROW_VALUE_LEN {
            return Err(GraphError::corruption(format!(
                "row value length {} invalid",
                bytes.len()
            )));
        }
        Ok(Self {
            created_at: ord::get_i64(bytes)?,
        })
    }
}

/// Smallest key strictly greater than every key starting with `prefix`.
///
/// Returns `None` when no such key exists (all bytes are `0xFF`).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    while let Some(last) = out.pop() {
        if last != 0xFF {
            out.push(last + 1);
            return Some(out);
        }
    }
    None
}
