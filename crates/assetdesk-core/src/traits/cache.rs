//! Cache provider trait for pluggable caching backends.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for cache backends.
///
/// All values are serialized as strings (JSON). The cache provider
/// is responsible for TTL enforcement.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Delete all keys starting with `prefix`. Returns the number removed.
    async fn delete_prefix(&self, prefix: &str) -> AppResult<u64>;

    /// Check that the cache backend is usable.
    async fn health_check(&self) -> AppResult<bool>;
}
