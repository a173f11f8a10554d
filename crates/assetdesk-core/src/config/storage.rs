//! Storage configuration.

use serde::{Deserialize, Serialize};

/// File storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root data directory for all disks.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Name of the default disk.
    #[serde(default = "default_disk")]
    pub default_disk: String,
    /// Local disk settings.
    #[serde(default)]
    pub local: LocalStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            default_disk: default_disk(),
            local: LocalStorageConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Resolve the local disk root, relative roots being joined onto `data_root`.
    pub fn local_root(&self) -> std::path::PathBuf {
        let root = std::path::Path::new(&self.local.root);
        if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::path::Path::new(&self.data_root).join(root)
        }
    }
}

/// Local filesystem disk configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Disk root, absolute or relative to `data_root`.
    #[serde(default = "default_local_root")]
    pub root: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root: default_local_root(),
        }
    }
}

fn default_data_root() -> String {
    "./data".to_string()
}

fn default_disk() -> String {
    "local".to_string()
}

fn default_local_root() -> String {
    "storage".to_string()
}
