//! Edge index storage layer.
//!
//! Represents each edge as sorted rows in an ordered key-value store, one
//! per direction and index, and turns adjacency queries back into canonical
//! in-memory edges.

/// Ordered key-value store contract and an in-memory implementation.
pub mod kv;

/// Secondary index definitions, registry and plan selection.
pub mod index;

/// Row key codec for edge index rows.
pub mod adjacency;

/// Property values and their order-preserving encoding.
pub mod props;

/// Primary element storage contract.
pub mod elements;

/// Scan descriptors for adjacency queries.
pub mod scan;

mod edge;
mod graph;
mod identity;
mod metrics;
mod options;
mod vertex;

/// Canonical edge handle.
pub use edge::{Edge, EdgeStructure};

/// Graph session and its lazy result sequences.
pub use graph::{EdgeIter, Graph, VertexIter};

pub use identity::IdentityMap;

/// Metrics collection.
pub use metrics::{default_metrics, CounterMetrics, IndexMetrics, NoopMetrics};

/// Graph configuration options.
pub use options::GraphOptions;

pub use vertex::{AdjacencyKey, Vertex};

pub use adjacency::CREATED_AT;
pub use elements::{EdgeRecord, ElementStore, MemElementStore};
pub use index::{IndexCatalog, IndexKey, IndexMetadata, IndexRegistry, IndexScope, OperationType};
pub use kv::{MemStore, Mutation, OrderedStore, Row, RowFilter, ScanSpec};
pub use props::PropValue;
