//! Schema migrations for the reporting tables.

use sqlx::PgPool;

use assetdesk_core::error::{AppError, ErrorKind};

/// Apply the embedded migrations under `migrations/`.
///
/// Only `report_definitions`, `report_files` and `jobs` are created here.
/// The asset and user tables reports read from belong to the host
/// application and must already exist.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    let migrator = sqlx::migrate!("../../migrations");
    tracing::info!(
        available = migrator.iter().count(),
        "Applying reporting schema migrations"
    );
    migrator.run(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Reporting schema migration failed: {e}"),
            e,
        )
    })?;
    tracing::info!("Reporting schema is up to date");
    Ok(())
}
