//! # assetdesk-api
//!
//! HTTP API layer for AssetDesk reports built on Axum.
//!
//! Provides the report endpoints, the bearer-token extractor, CORS and
//! request logging middleware, DTOs, and error mapping. [`app::run_server`]
//! wires the whole pipeline together, including the in-process worker.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{app_state, build_app, run_server};
pub use state::AppState;
