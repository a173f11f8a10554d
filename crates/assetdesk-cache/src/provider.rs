//! Cache manager that wraps the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use assetdesk_core::config::CacheConfig;
use assetdesk_core::result::AppResult;
use assetdesk_core::traits::cache::CacheProvider;

use crate::memory::MemoryCacheProvider;

/// Cache manager shared by services.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// The inner cache provider.
    inner: Arc<dyn CacheProvider>,
    /// TTL used by [`CacheManager::set_default`].
    default_ttl: Duration,
}

impl CacheManager {
    /// Create a cache manager from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        info!(
            max_capacity = config.max_capacity,
            default_ttl_seconds = config.default_ttl_seconds,
            "Initializing in-memory cache provider"
        );
        Self {
            inner: Arc::new(MemoryCacheProvider::new(config)),
            default_ttl: Duration::from_secs(config.default_ttl_seconds),
        }
    }

    /// Create a cache manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn CacheProvider>, default_ttl: Duration) -> Self {
        Self {
            inner: provider,
            default_ttl,
        }
    }

    /// Set a value with the configured default TTL.
    pub async fn set_default(&self, key: &str, value: &str) -> AppResult<()> {
        self.inner.set(key, value, self.default_ttl).await
    }

    /// Get and deserialize a JSON value. Undecodable entries count as misses.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        Ok(self
            .inner
            .get(key)
            .await?
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    /// Serialize and store a JSON value.
    pub async fn set_json<T: serde::Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.inner.set(key, &json, ttl).await
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<u64> {
        self.inner.delete_prefix(prefix).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
