use crate::storage::adjacency::CREATED_AT;

use super::catalog::IndexRegistry;
use super::types::{IndexKey, IndexScope, OperationType};

/// Test over an encoded property value.
///
/// Comparisons run on encoded bytes, which order like the values
/// themselves, so an index scan and a client-side filter agree exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyPredicate {
    /// Value equals the encoded bytes.
    Equals(Vec<u8>),
    /// Value lies in `[from, to)`.
    Range {
        /// Inclusive lower bound.
        from: Vec<u8>,
        /// Exclusive upper bound.
        to: Vec<u8>,
    },
}

impl PropertyPredicate {
    /// Evaluates the predicate against an encoded value.
    pub fn matches(&self, encoded: &[u8]) -> bool {
        match self {
            PropertyPredicate::Equals(value) => encoded == value.as_slice(),
            PropertyPredicate::Range { from, to } => {
                encoded >= from.as_slice() && encoded < to.as_slice()
            }
        }
    }
}

/// Physical access path chosen for a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexPlan {
    /// Primary rows scoped by vertex, direction and labels; no post-filter.
    Primary,
    /// Primary rows bounded by creation-time value; fully selective.
    CreatedAt(PropertyPredicate),
    /// Secondary index rows bounded by value; fully selective.
    Secondary {
        /// Index whose rows are scanned.
        index: IndexKey,
        /// Bound on the indexed value.
        predicate: PropertyPredicate,
    },
    /// Primary rows of one label with an in-memory property predicate.
    Fallback {
        /// Property tested after each edge is loaded.
        property_key: String,
        /// Test applied to the encoded property value.
        predicate: PropertyPredicate,
    },
}

impl IndexPlan {
    /// Short name used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IndexPlan::Primary => "primary",
            IndexPlan::CreatedAt(_) => "created_at",
            IndexPlan::Secondary { .. } => "secondary",
            IndexPlan::Fallback { .. } => "fallback",
        }
    }
}

/// Picks between a declared secondary index and the primary index.
pub struct IndexSelector<'a> {
    registry: &'a dyn IndexRegistry,
}

impl<'a> IndexSelector<'a> {
    /// Selector consulting `registry` for read-enabled indices.
    pub fn new(registry: &'a dyn IndexRegistry) -> Self {
        Self { registry }
    }

    /// Chooses a plan for a query on `label` with an optional property test.
    ///
    /// A read-enabled secondary index always wins over the fallback.
    pub fn select(&self, label: &str, property: Option<(&str, PropertyPredicate)>) -> IndexPlan {
        let Some((key, predicate)) = property else {
            return IndexPlan::Primary;
        };
        if key == CREATED_AT {
            return IndexPlan::CreatedAt(predicate);
        }
        if self
            .registry
            .has_index(OperationType::Read, IndexScope::Edge, label, key)
        {
            return IndexPlan::Secondary {
                index: IndexKey::edge(label, key),
                predicate,
            };
        }
        IndexPlan::Fallback {
            property_key: key.to_owned(),
            predicate,
        }
    }
}
