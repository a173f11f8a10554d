//! # assetdesk-storage
//!
//! Storage disks for generated report files. Disks are addressed by name
//! (`"local"`, ...) through the [`StorageManager`].

pub mod manager;
pub mod providers;

pub use manager::StorageManager;
