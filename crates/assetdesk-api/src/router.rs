//! Route definitions for the AssetDesk HTTP API.
//!
//! All routes are mounted under `/api`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(health_routes())
        .merge(report_routes());

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(request_logging))
        .with_state(state)
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/me/preferences", get(handlers::health::preferences))
}

/// Report definitions, exports and generated files
fn report_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reports",
            get(handlers::report::list_reports).post(handlers::report::create_report),
        )
        .route(
            "/reports/{id}",
            get(handlers::report::get_report)
                .put(handlers::report::update_report)
                .delete(handlers::report::delete_report),
        )
        .route("/reports/{id}/export", post(handlers::report::export_report))
        .route("/reports/{id}/files", get(handlers::report::list_files))
        .route(
            "/reports/files/{file_id}/download",
            get(handlers::report::download_file),
        )
}
