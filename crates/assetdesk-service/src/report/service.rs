//! Report service: the use cases behind the report endpoints.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use assetdesk_cache::{CacheManager, keys};
use assetdesk_core::AppError;
use assetdesk_core::config::ReportsConfig;
use assetdesk_core::result::AppResult;
use assetdesk_core::traits::cache::CacheProvider;
use assetdesk_core::traits::storage::ByteStream;
use assetdesk_core::types::{PageRequest, PageResponse, ReportFileId, ReportId};
use assetdesk_database::{ReportFileStore, ReportStore};
use assetdesk_entity::job::{Job, JobPayload, JobPriority};
use assetdesk_entity::report::{
    CreateReport, ExportFormat, ReportDefinition, Row, Schedule, UpdateReport,
};
use assetdesk_entity::report_file::ReportFile;
use assetdesk_storage::StorageManager;

use super::generator::ReportGenerator;
use super::resolver::{ReportDataResolver, validate_parts};
use crate::context::RequestContext;
use crate::jobs::JobSubmitter;

/// A column of a report preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewColumn {
    /// Field name.
    pub name: String,
    /// Header label.
    pub label: String,
}

/// The cached part of a report preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewData {
    /// Output columns, in order.
    pub columns: Vec<PreviewColumn>,
    /// Rows the definition selects in total.
    pub total_rows: i64,
    /// The first rows.
    pub rows: Vec<Row>,
}

/// A report definition with a preview of its rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPreview {
    /// The definition.
    pub report: ReportDefinition,
    /// Preview rows and totals.
    #[serde(flatten)]
    pub preview: PreviewData,
}

/// Result of an export request.
#[derive(Debug, Clone)]
pub enum ExportOutcome {
    /// Generated inline.
    Completed(ReportFile),
    /// Too large to run inline; queued as a job.
    Queued(Job),
}

/// A file ready to be streamed to the client.
pub struct Download {
    /// The file record.
    pub file: ReportFile,
    /// The object's bytes.
    pub stream: ByteStream,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download").field("file", &self.file).finish()
    }
}

/// Create, read, update, delete, export and download reports.
#[derive(Debug, Clone)]
pub struct ReportService {
    reports: Arc<dyn ReportStore>,
    files: Arc<dyn ReportFileStore>,
    resolver: ReportDataResolver,
    generator: ReportGenerator,
    jobs: JobSubmitter,
    storage: Arc<StorageManager>,
    cache: Arc<CacheManager>,
    config: ReportsConfig,
}

impl ReportService {
    /// Creates a new report service.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reports: Arc<dyn ReportStore>,
        files: Arc<dyn ReportFileStore>,
        resolver: ReportDataResolver,
        generator: ReportGenerator,
        jobs: JobSubmitter,
        storage: Arc<StorageManager>,
        cache: Arc<CacheManager>,
        config: ReportsConfig,
    ) -> Self {
        Self {
            reports,
            files,
            resolver,
            generator,
            jobs,
            storage,
            cache,
            config,
        }
    }

    /// Create a definition owned by the caller.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: CreateReport,
    ) -> AppResult<ReportDefinition> {
        let mut report = input.into_definition(ctx.user_id, Utc::now());
        check_definition(&mut report)?;
        let report = self.reports.create(&report).await?;
        tracing::info!(
            report_id = %report.id,
            owner_id = %report.owner_id,
            kind = %report.kind,
            "Report created"
        );
        Ok(report)
    }

    /// Apply `changes` to a definition the caller manages.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: ReportId,
        changes: UpdateReport,
    ) -> AppResult<ReportDefinition> {
        let current = self.find(id).await?;
        ctx.require_manage(&current)?;

        let mut next = changes.apply(&current, Utc::now());
        check_definition(&mut next)?;
        let report = self.reports.update(&next).await?;
        self.invalidate(id).await;
        tracing::info!(report_id = %id, user_id = %ctx.user_id, "Report updated");
        Ok(report)
    }

    /// Soft-delete a definition the caller manages.
    pub async fn delete(&self, ctx: &RequestContext, id: ReportId) -> AppResult<()> {
        let current = self.find(id).await?;
        ctx.require_manage(&current)?;
        if !self.reports.soft_delete(id, Utc::now()).await? {
            return Err(AppError::not_found(format!("Report {id} not found")));
        }
        self.invalidate(id).await;
        tracing::info!(report_id = %id, user_id = %ctx.user_id, "Report deleted");
        Ok(())
    }

    /// Definitions the caller can see: own and public ones, or all for admins.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ReportDefinition>> {
        let viewer = if ctx.is_admin() {
            None
        } else {
            Some(ctx.user_id)
        };
        self.reports.list_visible(viewer, page).await
    }

    /// A definition with its first rows. The preview is cached per viewer.
    pub async fn show(&self, ctx: &RequestContext, id: ReportId) -> AppResult<ReportPreview> {
        let report = self.find(id).await?;
        ctx.require_view(&report)?;

        let key = keys::report_preview(id.into_uuid(), ctx.user_id.into_uuid());
        match self.cache.get_json::<PreviewData>(&key).await {
            Ok(Some(preview)) => {
                tracing::debug!(report_id = %id, "Report preview served from cache");
                return Ok(ReportPreview { report, preview });
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(report_id = %id, error = %err, "Preview cache read failed"),
        }

        let query = self.resolver.query(&report)?;
        let columns = query
            .columns
            .iter()
            .filter_map(|name| report.kind.field(name))
            .map(|f| PreviewColumn {
                name: f.name.to_string(),
                label: f.label.to_string(),
            })
            .collect();
        let total_rows = self.resolver.count(&report).await?;
        let rows = self
            .resolver
            .page(&report, 0, self.config.preview_rows.max(0))
            .await?;
        let preview = PreviewData {
            columns,
            total_rows,
            rows,
        };

        let ttl = Duration::from_secs(self.config.show_cache_ttl_seconds);
        if let Err(err) = self.cache.set_json(&key, &preview, ttl).await {
            tracing::warn!(report_id = %id, error = %err, "Preview cache write failed");
        }
        Ok(ReportPreview { report, preview })
    }

    /// Export a report the caller can see.
    ///
    /// Exports above the configured row threshold are queued as a
    /// `report_generation` job; smaller ones run inline.
    pub async fn export(
        &self,
        ctx: &RequestContext,
        id: ReportId,
        format: Option<ExportFormat>,
    ) -> AppResult<ExportOutcome> {
        let report = self.find(id).await?;
        ctx.require_view(&report)?;
        let format = format.unwrap_or(report.format);

        let rows = self.resolver.count(&report).await?;
        if rows > self.config.async_threshold_rows {
            let payload = JobPayload::ReportGeneration {
                report_id: id,
                format,
                requested_by: Some(ctx.user_id),
            };
            let job = self
                .jobs
                .submit(&payload, JobPriority::High, Some(ctx.user_id))
                .await?;
            tracing::info!(
                report_id = %id,
                job_id = %job.id,
                rows,
                "Export queued"
            );
            return Ok(ExportOutcome::Queued(job));
        }

        let file = self
            .generator
            .generate(&report, format, Some(ctx.user_id))
            .await?;
        Ok(ExportOutcome::Completed(file))
    }

    /// Generated files of a report the caller can see, newest first.
    pub async fn files(&self, ctx: &RequestContext, id: ReportId) -> AppResult<Vec<ReportFile>> {
        let report = self.find(id).await?;
        ctx.require_view(&report)?;
        self.files.list_by_report(id).await
    }

    /// Open a generated file for streaming.
    ///
    /// Rejects files of invisible or deleted reports, expired files
    /// (`expires_at <= now`), and files whose object is gone.
    pub async fn download(&self, ctx: &RequestContext, file_id: ReportFileId) -> AppResult<Download> {
        let file = self
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Report file {file_id} not found")))?;
        let report = self.find(file.report_id).await?;
        ctx.require_view(&report)?;

        if file.is_expired_at(Utc::now()) {
            return Err(AppError::expired(format!(
                "Report file {file_id} has expired"
            )));
        }

        let disk = self.storage.disk(&file.disk).await?;
        if !disk.exists(&file.file_path).await? {
            tracing::warn!(file_id = %file_id, path = %file.file_path, "Report file object missing");
            return Err(AppError::not_found(format!(
                "Report file {file_id} is no longer available"
            )));
        }
        let stream = disk.read(&file.file_path).await?;
        tracing::info!(file_id = %file_id, user_id = %ctx.user_id, "Report file downloaded");
        Ok(Download { file, stream })
    }

    async fn find(&self, id: ReportId) -> AppResult<ReportDefinition> {
        self.reports
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Report {id} not found")))
    }

    async fn invalidate(&self, id: ReportId) {
        let prefix = keys::report_prefix(id.into_uuid());
        if let Err(err) = self.cache.delete_prefix(&prefix).await {
            tracing::warn!(report_id = %id, error = %err, "Failed to invalidate report cache");
        }
    }
}

/// Validate a definition about to be saved and normalize its schedule day.
fn check_definition(report: &mut ReportDefinition) -> AppResult<()> {
    if report.name.trim().is_empty() {
        return Err(AppError::validation("Report name must not be empty"));
    }
    validate_parts(
        report.kind,
        &report.columns.0,
        &report.filters.0,
        report.sort_field.as_deref(),
    )?;
    report.schedule_day = Schedule::validate(
        report.is_scheduled,
        report.frequency,
        report.schedule_day.as_deref(),
        report.schedule_time,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixture::{self, Fixture};
    use assetdesk_core::error::ErrorKind;
    use assetdesk_core::types::UserId;
    use assetdesk_entity::job::REPORT_GENERATION;
    use assetdesk_core::types::{FilterField, FilterOp, FilterValue};
    use assetdesk_entity::report::{Frequency, ReportKind, ReportStatus};
    use assetdesk_entity::user::UserRole;
    use chrono::NaiveTime;
    use futures::StreamExt;

    fn service(fx: &Fixture) -> ReportService {
        ReportService::new(
            fx.reports.clone(),
            fx.files.clone(),
            fx.resolver(),
            fx.generator(),
            fx.submitter(),
            fx.storage.clone(),
            fx.cache.clone(),
            fx.config.clone(),
        )
    }

    fn user() -> RequestContext {
        RequestContext::new(UserId::new(), UserRole::User, "jdoe")
    }

    fn admin() -> RequestContext {
        RequestContext::new(UserId::new(), UserRole::Admin, "root")
    }

    #[tokio::test]
    async fn test_create_validates_columns_and_schedule() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let ctx = user();

        let mut bad = fixture::create_input();
        bad.columns = vec!["serial_number_typo".to_string()];
        let err = svc.create(&ctx, bad).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let mut weekly = fixture::create_input();
        weekly.is_scheduled = true;
        weekly.frequency = Some(Frequency::Weekly);
        weekly.schedule_day = Some("Monday".to_string());
        weekly.schedule_time = Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let created = svc.create(&ctx, weekly).await.unwrap();
        assert_eq!(created.owner_id, ctx.user_id);
        assert_eq!(created.schedule_day.as_deref(), Some("monday"));
        assert_eq!(created.status, ReportStatus::Pending);
    }

    #[tokio::test]
    async fn test_incompatible_filter_rejected() {
        let fx = Fixture::new().await;
        let mut input = fixture::create_input();
        input.filters = vec![FilterField::new(
            "purchase_date",
            FilterOp::Like,
            FilterValue::String("2024%".to_string()),
        )];
        let err = service(&fx).create(&user(), input).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_can_update() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let owner = user();
        let report = svc.create(&owner, fixture::create_input()).await.unwrap();
        let changes = UpdateReport {
            name: Some("Renamed".to_string()),
            ..UpdateReport::default()
        };

        let err = svc.update(&user(), report.id, changes.clone()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        let updated = svc.update(&admin(), report.id, changes).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.owner_id, owner.user_id);
    }

    #[tokio::test]
    async fn test_list_shows_own_and_public_reports() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let alice = user();
        let bob = user();
        svc.create(&alice, fixture::create_input()).await.unwrap();
        let mut public = fixture::create_input();
        public.is_public = true;
        svc.create(&alice, public).await.unwrap();
        svc.create(&bob, fixture::create_input()).await.unwrap();

        let page = PageRequest::new(1, 20);
        assert_eq!(svc.list(&alice, &page).await.unwrap().total_items, 2);
        assert_eq!(svc.list(&bob, &page).await.unwrap().total_items, 2);
        assert_eq!(svc.list(&admin(), &page).await.unwrap().total_items, 3);
    }

    #[tokio::test]
    async fn test_show_caches_preview_until_update() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let ctx = user();
        let report = svc.create(&ctx, fixture::create_input()).await.unwrap();

        let first = svc.show(&ctx, report.id).await.unwrap();
        assert_eq!(first.preview.total_rows, 5);
        assert_eq!(first.preview.rows.len(), 5);
        assert_eq!(first.preview.columns[0].label, "Asset Tag");

        fx.rows.extend(ReportKind::Asset, [fixture::asset(6)]).await;
        let cached = svc.show(&ctx, report.id).await.unwrap();
        assert_eq!(cached.preview.total_rows, 5);

        let changes = UpdateReport {
            description: Some(Some("All of them".to_string())),
            ..UpdateReport::default()
        };
        svc.update(&ctx, report.id, changes).await.unwrap();
        let fresh = svc.show(&ctx, report.id).await.unwrap();
        assert_eq!(fresh.preview.total_rows, 6);
        assert_eq!(fresh.report.description.as_deref(), Some("All of them"));
    }

    #[tokio::test]
    async fn test_private_report_hidden_from_others() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let report = svc.create(&user(), fixture::create_input()).await.unwrap();
        let err = svc.show(&user(), report.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_deleted_report_is_not_found() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let ctx = user();
        let report = svc.create(&ctx, fixture::create_input()).await.unwrap();
        svc.delete(&ctx, report.id).await.unwrap();

        let err = svc.show(&ctx, report.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = svc.delete(&ctx, report.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_small_export_runs_inline_and_downloads() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let ctx = user();
        let report = svc.create(&ctx, fixture::create_input()).await.unwrap();

        let file = match svc.export(&ctx, report.id, None).await.unwrap() {
            ExportOutcome::Completed(file) => file,
            ExportOutcome::Queued(job) => panic!("unexpected job {}", job.id),
        };
        assert_eq!(file.format, ExportFormat::Csv);
        assert_eq!(svc.files(&ctx, report.id).await.unwrap().len(), 1);

        let download = svc.download(&ctx, file.id).await.unwrap();
        let mut body = Vec::new();
        let mut stream = download.stream;
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert!(String::from_utf8(body).unwrap().starts_with("Asset Tag,Name"));
    }

    #[tokio::test]
    async fn test_large_export_is_queued() {
        let mut fx = Fixture::new().await;
        fx.config.async_threshold_rows = 3;
        let svc = service(&fx);
        let ctx = user();
        let report = svc.create(&ctx, fixture::create_input()).await.unwrap();

        let outcome = svc
            .export(&ctx, report.id, Some(ExportFormat::Xlsx))
            .await
            .unwrap();
        let ExportOutcome::Queued(job) = outcome else {
            panic!("expected a queued export");
        };
        assert_eq!(job.job_type, REPORT_GENERATION);
        assert_eq!(
            JobPayload::decode(&job.job_type, &job.payload).unwrap(),
            JobPayload::ReportGeneration {
                report_id: report.id,
                format: ExportFormat::Xlsx,
                requested_by: Some(ctx.user_id),
            }
        );
        assert!(fx.files.is_empty().await);
    }

    #[tokio::test]
    async fn test_file_expiring_now_is_rejected() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let ctx = user();
        let report = svc.create(&ctx, fixture::create_input()).await.unwrap();
        let ExportOutcome::Completed(mut file) = svc.export(&ctx, report.id, None).await.unwrap()
        else {
            panic!("expected an inline export");
        };

        file.expires_at = Some(Utc::now());
        fx.files.delete(file.id).await.unwrap();
        fx.files.insert(file.clone()).await;

        let err = svc.download(&ctx, file.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Expired);
    }

    #[tokio::test]
    async fn test_download_of_missing_object_is_not_found() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let ctx = user();
        let report = svc.create(&ctx, fixture::create_input()).await.unwrap();
        let ExportOutcome::Completed(file) = svc.export(&ctx, report.id, None).await.unwrap() else {
            panic!("expected an inline export");
        };
        std::fs::remove_file(fx.disk_path(&file.file_path)).unwrap();

        let err = svc.download(&ctx, file.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
