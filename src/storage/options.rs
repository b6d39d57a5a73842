use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{GraphError, Result};

/// Configuration options supplied when opening a [`super::Graph`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphOptions {
    /// Whether decoded edges are returned without loading their primary
    /// record or checking their endpoints.
    pub lazy_loading: bool,
    /// Per-vertex adjacency cache capacity in query results; 0 disables caching.
    pub adjacency_cache_capacity: usize,
    /// Number of shards to split the identity map across.
    pub identity_shards: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            lazy_loading: false,
            adjacency_cache_capacity: 64,
            identity_shards: 16,
        }
    }
}

impl GraphOptions {
    /// Creates a new GraphOptions with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables lazy edge loading.
    pub fn lazy_loading(mut self, enabled: bool) -> Self {
        self.lazy_loading = enabled;
        self
    }

    /// Sets the per-vertex adjacency cache capacity.
    pub fn adjacency_cache_capacity(mut self, capacity: usize) -> Self {
        self.adjacency_cache_capacity = capacity;
        self
    }

    /// Sets the identity map shard count (clamped to at least one).
    pub fn identity_shards(mut self, shards: usize) -> Self {
        self.identity_shards = shards.max(1);
        self
    }

    /// Parses options from TOML. Missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let opts: GraphOptions =
            toml::from_str(text).map_err(|err| GraphError::Config(err.to_string()))?;
        let shards = opts.identity_shards;
        Ok(opts.identity_shards(shards))
    }

    /// Reads and parses a TOML options file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
