//! Low-level primitives for building the edge index.

/// Byte-level utilities and encoding/decoding.
///
/// Order-preserving encoders for fixed-width integers, floats and strings,
/// plus a fallible cursor for reading them back.
pub mod bytes;
