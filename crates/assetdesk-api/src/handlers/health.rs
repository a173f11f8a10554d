//! Health check and caller preference handlers.

use axum::Json;

use crate::dto::response::{ApiResponse, HealthResponse, PreferencesResponse};
use crate::extractors::AuthUser;

/// GET /api/health
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// GET /api/me/preferences
pub async fn preferences(auth: AuthUser) -> Json<ApiResponse<PreferencesResponse>> {
    Json(ApiResponse::ok(PreferencesResponse {
        username: auth.username.clone(),
        preferences: auth.preferences,
    }))
}
