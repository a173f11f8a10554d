//! Cache configuration.

use serde::{Deserialize, Serialize};

/// In-memory cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Default TTL for cached entries in seconds.
    #[serde(default = "default_ttl")]
    pub default_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            default_ttl_seconds: default_ttl(),
        }
    }
}

fn default_max_capacity() -> u64 {
    10_000
}

fn default_ttl() -> u64 {
    300
}
