//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use assetdesk_auth::JwtDecoder;
use assetdesk_core::config::AppConfig;
use assetdesk_service::ReportService;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Bearer token verifier
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Report use cases
    pub reports: Arc<ReportService>,
}

impl AppState {
    /// Assemble the state from its parts.
    pub fn new(config: Arc<AppConfig>, jwt_decoder: Arc<JwtDecoder>, reports: Arc<ReportService>) -> Self {
        Self {
            config,
            jwt_decoder,
            reports,
        }
    }
}
