//! Contract of the ordered key-value store the edge index is built on.
//!
//! Rows are sorted by raw key bytes. A scan walks `[start, stop)` in
//! ascending order and evaluates its [`RowFilter`] against every row inside
//! the store, so rejected rows are never handed back.

mod mem;

pub use mem::MemStore;

use crate::types::Result;

/// One physical row as returned by a scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    /// Raw key bytes.
    pub key: Vec<u8>,
    /// Value area.
    pub value: Vec<u8>,
    /// Write timestamp assigned by the store when the row was put.
    pub ts: u64,
}

/// Composable server-side row filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowFilter {
    /// Key starts with the given bytes.
    Prefix(Vec<u8>),
    /// Every child must pass.
    All(Vec<RowFilter>),
    /// At least one child must pass.
    Any(Vec<RowFilter>),
}

impl RowFilter {
    /// Evaluates the filter against a row key.
    pub fn matches(&self, key: &[u8]) -> bool {
        match self {
            RowFilter::Prefix(prefix) => key.starts_with(prefix),
            RowFilter::All(children) => children.iter().all(|f| f.matches(key)),
            RowFilter::Any(children) => children.iter().any(|f| f.matches(key)),
        }
    }

    /// Combines `self` and `other` under a must-pass-all node.
    pub fn and(self, other: RowFilter) -> RowFilter {
        match self {
            RowFilter::All(mut children) => {
                children.push(other);
                RowFilter::All(children)
            }
            first => RowFilter::All(vec![first, other]),
        }
    }
}

/// A range scan request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanSpec {
    /// Inclusive start key.
    pub start: Vec<u8>,
    /// Exclusive stop key; `None` scans to the end of the keyspace.
    pub stop: Option<Vec<u8>>,
    /// Row filter evaluated by the store.
    pub filter: Option<RowFilter>,
}

impl ScanSpec {
    /// Returns true if `key` falls inside the range and passes the filter.
    pub fn admits(&self, key: &[u8]) -> bool {
        if key < self.start.as_slice() {
            return false;
        }
        if let Some(stop) = &self.stop {
            if key >= stop.as_slice() {
                return false;
            }
        }
        self.filter.as_ref().map_or(true, |f| f.matches(key))
    }
}

/// A single-row mutation. Batches are applied in order with no atomicity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// Writes a row; the store assigns the write timestamp.
    Put {
        /// Row key.
        key: Vec<u8>,
        /// Row value.
        value: Vec<u8>,
    },
    /// Removes a row. With `up_to`, only a row written at or before that
    /// timestamp is removed, so a newer write of the same key survives.
    Delete {
        /// Row key.
        key: Vec<u8>,
        /// Optional inclusive timestamp bound.
        up_to: Option<u64>,
    },
}

/// Lazily produced scan output.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Row>> + Send + 'a>;

/// Ordered key-value store consumed by the edge index.
pub trait OrderedStore: Send + Sync {
    /// Starts a scan; rows are produced in ascending key order.
    fn scan(&self, spec: &ScanSpec) -> Result<RowStream<'_>>;

    /// Point lookup.
    fn get(&self, key: &[u8]) -> Result<Option<Row>>;

    /// Applies mutations in order. Every put in one batch receives the same
    /// write timestamp, later than any earlier batch. A failure leaves
    /// earlier mutations applied.
    fn apply(&self, mutations: Vec<Mutation>) -> Result<()>;
}
