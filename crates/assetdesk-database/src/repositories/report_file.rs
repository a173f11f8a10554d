//! Report file repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use assetdesk_core::error::{AppError, ErrorKind};
use assetdesk_core::result::AppResult;
use assetdesk_core::types::{ReportFileId, ReportId};
use assetdesk_entity::report_file::{CreateReportFile, ReportFile};

use crate::store::ReportFileStore;

/// Repository for generated report files.
#[derive(Debug, Clone)]
pub struct ReportFileRepository {
    pool: PgPool,
}

impl ReportFileRepository {
    /// Create a new report file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportFileStore for ReportFileRepository {
    async fn create(&self, data: &CreateReportFile) -> AppResult<ReportFile> {
        sqlx::query_as::<_, ReportFile>(
            "INSERT INTO report_files (id, report_id, file_name, file_path, disk, file_size, \
             mime_type, format, row_count, generated_by, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(ReportFileId::new())
        .bind(data.report_id)
        .bind(&data.file_name)
        .bind(&data.file_path)
        .bind(&data.disk)
        .bind(data.file_size)
        .bind(&data.mime_type)
        .bind(data.format)
        .bind(data.row_count)
        .bind(data.generated_by)
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record report file", e))
    }

    async fn find_by_id(&self, id: ReportFileId) -> AppResult<Option<ReportFile>> {
        sqlx::query_as::<_, ReportFile>("SELECT * FROM report_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find report file", e))
    }

    async fn list_by_report(&self, report_id: ReportId) -> AppResult<Vec<ReportFile>> {
        sqlx::query_as::<_, ReportFile>(
            "SELECT * FROM report_files WHERE report_id = $1 ORDER BY created_at DESC",
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list report files", e))
    }

    async fn delete(&self, id: ReportFileId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM report_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete report file", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_expired_batch(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<ReportFileId>,
        limit: i64,
    ) -> AppResult<Vec<ReportFile>> {
        sqlx::query_as::<_, ReportFile>(
            "SELECT * FROM report_files \
             WHERE expires_at IS NOT NULL AND expires_at <= $1 \
             AND ($2::uuid IS NULL OR id > $2) \
             ORDER BY id ASC LIMIT $3",
        )
        .bind(cutoff)
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find expired report files", e)
        })
    }
}
