//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a `GraphStore`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Time-to-live for cached query results
    pub cache_ttl: Duration,

    /// Traversal depth used when a query does not specify one
    pub default_max_depth: usize,

    /// Result cap for vector search when the caller does not specify one
    pub vector_limit: usize,

    /// Minimum similarity for vector search hits
    pub vector_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            default_max_depth: 2,
            vector_limit: 10,
            vector_threshold: 0.7,
        }
    }
}

impl EngineConfig {
    /// Configuration with a short cache TTL, for tests that exercise expiry
    pub fn short_ttl(ttl: Duration) -> Self {
        Self {
            cache_ttl: ttl,
            ..Self::default()
        }
    }

    /// Set the cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the default traversal depth
    pub fn with_default_max_depth(mut self, depth: usize) -> Self {
        self.default_max_depth = depth;
        self
    }
}
