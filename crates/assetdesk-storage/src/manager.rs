//! Storage manager, which routes operations to a disk by name.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use assetdesk_core::config::StorageConfig;
use assetdesk_core::error::AppError;
use assetdesk_core::result::AppResult;
use assetdesk_core::traits::storage::StorageProvider;

use crate::providers::LocalStorageProvider;

/// Central registry of named storage disks.
#[derive(Debug, Clone)]
pub struct StorageManager {
    /// Map of disk name → provider instance.
    disks: Arc<RwLock<HashMap<String, Arc<dyn StorageProvider>>>>,
    /// Name of the default disk.
    default_disk: String,
}

impl StorageManager {
    /// Create an empty manager whose default disk is `default_disk`.
    pub fn new(default_disk: impl Into<String>) -> Self {
        Self {
            disks: Arc::new(RwLock::new(HashMap::new())),
            default_disk: default_disk.into(),
        }
    }

    /// Build the manager from configuration, registering the local disk.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let manager = Self::new(config.default_disk.clone());
        let root = config.local_root();
        info!(root = %root.display(), "Registering local storage disk");
        let local = LocalStorageProvider::new(root).await?;
        manager.register("local", Arc::new(local)).await;
        Ok(manager)
    }

    /// Register a disk under `name`, replacing any previous one.
    pub async fn register(&self, name: impl Into<String>, provider: Arc<dyn StorageProvider>) {
        self.disks.write().await.insert(name.into(), provider);
    }

    /// Get a disk by name.
    pub async fn disk(&self, name: &str) -> AppResult<Arc<dyn StorageProvider>> {
        self.disks
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::configuration(format!("Storage disk '{name}' is not configured")))
    }

    /// Get the default disk.
    pub async fn default_disk(&self) -> AppResult<Arc<dyn StorageProvider>> {
        self.disk(&self.default_disk).await
    }

    /// Name of the default disk.
    pub fn default_disk_name(&self) -> &str {
        &self.default_disk
    }

    /// Check health of all registered disks.
    pub async fn health_check_all(&self) -> HashMap<String, bool> {
        let disks = self.disks.read().await;
        let mut results = HashMap::new();
        for (name, provider) in disks.iter() {
            let healthy = provider.health_check().await.unwrap_or(false);
            results.insert(name.clone(), healthy);
        }
        results
    }
}
