//! Report definition repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use assetdesk_core::error::{AppError, ErrorKind};
use assetdesk_core::result::AppResult;
use assetdesk_core::types::{PageRequest, PageResponse, ReportId, UserId};
use assetdesk_entity::report::{ReportDefinition, ReportStatus};

use crate::store::ReportStore;

/// Repository for report definitions.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    /// Create a new report repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn visibility<'a>(builder: &mut QueryBuilder<'a, Postgres>, viewer: Option<UserId>) {
        builder.push(" WHERE deleted_at IS NULL");
        if let Some(viewer) = viewer {
            builder
                .push(" AND (owner_id = ")
                .push_bind(viewer)
                .push(" OR is_public)");
        }
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn find_by_id(&self, id: ReportId) -> AppResult<Option<ReportDefinition>> {
        sqlx::query_as::<_, ReportDefinition>(
            "SELECT * FROM report_definitions WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find report", e))
    }

    async fn list_visible(
        &self,
        viewer: Option<UserId>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ReportDefinition>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM report_definitions");
        Self::visibility(&mut count, viewer);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count reports", e))?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM report_definitions");
        Self::visibility(&mut select, viewer);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let reports = select
            .build_query_as::<ReportDefinition>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list reports", e))?;

        Ok(PageResponse::new(
            reports,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    async fn create(&self, report: &ReportDefinition) -> AppResult<ReportDefinition> {
        sqlx::query_as::<_, ReportDefinition>(
            "INSERT INTO report_definitions (id, name, description, kind, format, columns, filters, \
             sort_field, sort_direction, is_scheduled, frequency, schedule_day, schedule_time, \
             status, owner_id, is_public, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING *",
        )
        .bind(report.id)
        .bind(&report.name)
        .bind(&report.description)
        .bind(report.kind)
        .bind(report.format)
        .bind(&report.columns)
        .bind(&report.filters)
        .bind(&report.sort_field)
        .bind(report.sort_direction)
        .bind(report.is_scheduled)
        .bind(report.frequency)
        .bind(&report.schedule_day)
        .bind(report.schedule_time)
        .bind(report.status)
        .bind(report.owner_id)
        .bind(report.is_public)
        .bind(report.created_at)
        .bind(report.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create report", e))
    }

    async fn update(&self, report: &ReportDefinition) -> AppResult<ReportDefinition> {
        sqlx::query_as::<_, ReportDefinition>(
            "UPDATE report_definitions SET name = $2, description = $3, kind = $4, format = $5, \
             columns = $6, filters = $7, sort_field = $8, sort_direction = $9, is_scheduled = $10, \
             frequency = $11, schedule_day = $12, schedule_time = $13, is_public = $14, \
             updated_at = $15 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(report.id)
        .bind(&report.name)
        .bind(&report.description)
        .bind(report.kind)
        .bind(report.format)
        .bind(&report.columns)
        .bind(&report.filters)
        .bind(&report.sort_field)
        .bind(report.sort_direction)
        .bind(report.is_scheduled)
        .bind(report.frequency)
        .bind(&report.schedule_day)
        .bind(report.schedule_time)
        .bind(report.is_public)
        .bind(report.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update report", e))?
        .ok_or_else(|| AppError::not_found(format!("Report {} not found", report.id)))
    }

    async fn soft_delete(&self, id: ReportId, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE report_definitions SET deleted_at = $2, updated_at = $2 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete report", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_active_scheduled(&self) -> AppResult<Vec<ReportDefinition>> {
        sqlx::query_as::<_, ReportDefinition>(
            "SELECT * FROM report_definitions \
             WHERE is_scheduled AND deleted_at IS NULL ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list scheduled reports", e)
        })
    }

    async fn claim_for_run(
        &self,
        id: ReportId,
        observed_last_run: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE report_definitions SET status = 'processing', last_run_at = $2, \
             error_message = NULL, updated_at = $2 \
             WHERE id = $1 AND deleted_at IS NULL \
             AND last_run_at IS NOT DISTINCT FROM $3 \
             AND (status <> 'processing' OR updated_at < $4)",
        )
        .bind(id)
        .bind(now)
        .bind(observed_last_run)
        .bind(stale_before)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim report", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_status(
        &self,
        id: ReportId,
        status: ReportStatus,
        error_message: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE report_definitions SET status = $2, error_message = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update report status", e)
        })?;
        Ok(())
    }
}
