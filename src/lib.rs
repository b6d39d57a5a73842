//! Edge index and adjacency encoding for a graph store layered on an
//! ordered key-value store.
//!
//! Edges are written as salted, order-preserving row keys filed under each
//! endpoint. Adjacency queries pick between a declared secondary index and
//! the mandatory creation-time index, scan lazily, merge rows onto one
//! canonical instance per edge, and repair rows that reference data which
//! no longer exists.

#![warn(missing_docs)]

pub mod error;
/// Low-level byte encoders.
pub mod primitives;
pub mod storage;
pub mod types;
