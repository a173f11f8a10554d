//! # assetdesk-cache
//!
//! Cache provider implementation for AssetDesk. Entries live in-process in a
//! [moka](https://crates.io/crates/moka) cache with per-entry TTLs.

pub mod keys;
pub mod memory;
pub mod provider;

pub use memory::MemoryCacheProvider;
pub use provider::CacheManager;
