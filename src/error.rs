//! Error type shared across the crate.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::types::ElementKind;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised by the edge index layer.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The ordered store could not complete a scan, get, or mutation.
    #[error("store error: {0}")]
    Store(#[source] Box<dyn StdError + Send + Sync>),
    /// Local I/O failure (configuration files, CLI inputs).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Key or value bytes did not match the expected layout.
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// A referenced element no longer exists.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Which kind of element failed to resolve.
        kind: ElementKind,
        /// Raw identifier of the missing element.
        id: u64,
    },
    /// Caller supplied an argument the layer cannot honor.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GraphError {
    /// Wraps an arbitrary backend failure as a store error.
    pub fn store<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        GraphError::Store(err.into())
    }

    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        GraphError::Corruption(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GraphError::InvalidArgument(msg.into())
    }

    /// Returns true when the error denotes a stale reference.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GraphError::NotFound { .. })
    }
}
