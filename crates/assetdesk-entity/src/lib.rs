//! # assetdesk-entity
//!
//! Domain entity models for AssetDesk reporting. Every struct in this crate
//! represents a database table row or a domain value object. Database
//! entities derive `sqlx::FromRow`; enums map onto PostgreSQL enum types.

pub mod job;
pub mod report;
pub mod report_file;
pub mod user;
