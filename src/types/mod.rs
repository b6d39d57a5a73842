//! Identifier newtypes and small shared enums.
#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

pub use crate::error::{GraphError, Result};

/// Identifier of a vertex.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct VertexId(pub u64);

/// Identifier of an edge.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VertexId {
    fn from(value: u64) -> Self {
        VertexId(value)
    }
}

impl From<u64> for EdgeId {
    fn from(value: u64) -> Self {
        EdgeId(value)
    }
}

/// Traversal direction relative to a vertex.
///
/// Only `Out` and `In` are ever persisted; `Both` is a query-side shorthand.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Edges whose out-vertex is the queried vertex.
    Out,
    /// Edges whose in-vertex is the queried vertex.
    In,
    /// Both of the above.
    Both,
}

impl Direction {
    /// Returns true when outgoing edges are part of the selection.
    pub fn includes_out(self) -> bool {
        matches!(self, Direction::Out | Direction::Both)
    }

    /// Returns true when incoming edges are part of the selection.
    pub fn includes_in(self) -> bool {
        matches!(self, Direction::In | Direction::Both)
    }

    /// Expands the direction into the concrete directions it covers.
    pub fn concrete(self) -> &'static [Direction] {
        match self {
            Direction::Out => &[Direction::Out],
            Direction::In => &[Direction::In],
            Direction::Both => &[Direction::In, Direction::Out],
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Direction::Out => "out",
            Direction::In => "in",
            Direction::Both => "both",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of graph element, used when reporting unresolved references.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ElementKind {
    /// A vertex.
    Vertex,
    /// An edge.
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Vertex => f.write_str("vertex"),
            ElementKind::Edge => f.write_str("edge"),
        }
    }
}
