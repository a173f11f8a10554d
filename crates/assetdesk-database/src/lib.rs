//! # assetdesk-database
//!
//! PostgreSQL connection management, the store traits the report pipeline
//! is written against, their PostgreSQL repositories, and in-memory
//! implementations used by tests and local tooling.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{JobStats, JobStore, ReportFileStore, ReportStore, RowSource};
