//! # assetdesk-core
//!
//! Core crate for AssetDesk reporting. Contains the storage and cache
//! traits, configuration schemas, typed identifiers, pagination/sorting/filter
//! types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other AssetDesk crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
