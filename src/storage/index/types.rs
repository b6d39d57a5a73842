use std::fmt;

use serde::{Deserialize, Serialize};

/// Element kind an index is declared over.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexScope {
    /// Edge property index.
    Edge,
    /// Vertex property index.
    Vertex,
}

/// Which side of the index lifecycle a lookup is for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OperationType {
    /// Query planning: only read-enabled indices qualify.
    Read,
    /// Mutation: only write-enabled indices qualify.
    Write,
}

/// Identifies the physical index that produced a row.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct IndexKey {
    /// Element kind the index covers.
    pub scope: IndexScope,
    /// Label the index is declared on.
    pub label: String,
    /// Indexed property key.
    pub property_key: String,
}

impl IndexKey {
    pub fn new(scope: IndexScope, label: impl Into<String>, property_key: impl Into<String>) -> Self {
        Self {
            scope,
            label: label.into(),
            property_key: property_key.into(),
        }
    }

    /// Shorthand for an edge-scoped key.
    pub fn edge(label: impl Into<String>, property_key: impl Into<String>) -> Self {
        Self::new(IndexScope::Edge, label, property_key)
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            IndexScope::Edge => "edge",
            IndexScope::Vertex => "vertex",
        };
        write!(f, "{scope}:{}:{}", self.label, self.property_key)
    }
}

/// Declared secondary index.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub key: IndexKey,
    /// Queries may use the index.
    pub readable: bool,
    /// Mutations must maintain the index.
    pub writable: bool,
}

impl IndexMetadata {
    pub fn enabled_for(&self, op: OperationType) -> bool {
        match op {
            OperationType::Read => self.readable,
            OperationType::Write => self.writable,
        }
    }
}
