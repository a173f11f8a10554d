//! Report generator: resolve, export, store, record.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use assetdesk_core::AppError;
use assetdesk_core::config::ReportsConfig;
use assetdesk_core::result::AppResult;
use assetdesk_core::traits::storage::StorageProvider;
use assetdesk_core::types::{ReportFileId, ReportId, UserId};
use assetdesk_database::{ReportFileStore, ReportStore};
use assetdesk_entity::report::{ExportFormat, ReportDefinition, ReportStatus};
use assetdesk_entity::report_file::{CreateReportFile, ReportFile};
use assetdesk_storage::StorageManager;

use super::export::{ExportColumn, ReportExporter};
use super::resolver::ReportDataResolver;

/// Produces report files and records them.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    reports: Arc<dyn ReportStore>,
    files: Arc<dyn ReportFileStore>,
    resolver: ReportDataResolver,
    exporter: ReportExporter,
    storage: Arc<StorageManager>,
    config: ReportsConfig,
}

impl ReportGenerator {
    /// Creates a new generator.
    pub fn new(
        reports: Arc<dyn ReportStore>,
        files: Arc<dyn ReportFileStore>,
        resolver: ReportDataResolver,
        exporter: ReportExporter,
        storage: Arc<StorageManager>,
        config: ReportsConfig,
    ) -> Self {
        Self {
            reports,
            files,
            resolver,
            exporter,
            storage,
            config,
        }
    }

    /// Generate a file for the report with `id`.
    pub async fn generate_by_id(
        &self,
        id: ReportId,
        format: ExportFormat,
        requested_by: Option<UserId>,
    ) -> AppResult<ReportFile> {
        let report = self
            .reports
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Report {id} not found")))?;
        self.generate(&report, format, requested_by).await
    }

    /// Generate a file for `report` and record the run outcome on it.
    ///
    /// On success the report is marked `completed`; on any failure it is
    /// marked `failed` with the error message and the error is returned.
    pub async fn generate(
        &self,
        report: &ReportDefinition,
        format: ExportFormat,
        requested_by: Option<UserId>,
    ) -> AppResult<ReportFile> {
        let started = std::time::Instant::now();
        match self.produce(report, format, requested_by).await {
            Ok(file) => {
                self.reports
                    .mark_status(report.id, ReportStatus::Completed, None)
                    .await?;
                tracing::info!(
                    report_id = %report.id,
                    file_id = %file.id,
                    format = %format,
                    rows = file.row_count,
                    bytes = file.file_size,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Report generated"
                );
                Ok(file)
            }
            Err(err) => {
                tracing::error!(
                    report_id = %report.id,
                    format = %format,
                    error = %err,
                    "Report generation failed"
                );
                if let Err(mark_err) = self
                    .reports
                    .mark_status(report.id, ReportStatus::Failed, Some(&err.message))
                    .await
                {
                    tracing::error!(
                        report_id = %report.id,
                        error = %mark_err,
                        "Failed to record report failure"
                    );
                }
                Err(err)
            }
        }
    }

    /// Record a run that ended without reaching [`Self::generate`]'s own
    /// bookkeeping, such as one cut off by the worker's timeout.
    pub async fn mark_failed(&self, id: ReportId, message: &str) -> AppResult<()> {
        tracing::warn!(report_id = %id, error = %message, "Report run abandoned");
        self.reports
            .mark_status(id, ReportStatus::Failed, Some(message))
            .await
    }

    async fn produce(
        &self,
        report: &ReportDefinition,
        format: ExportFormat,
        requested_by: Option<UserId>,
    ) -> AppResult<ReportFile> {
        let query = self.resolver.query(report)?;
        let columns = ExportColumn::for_kind(report.kind, &query.columns)?;
        let rows = self
            .resolver
            .stream(report, self.config.stream_batch_size.max(1) as usize)?;

        let artifact = self
            .exporter
            .export(rows, columns, format, &report.name)
            .await?;

        let now = Utc::now();
        let file_name = file_name(&report.name, format, now);
        let key = storage_key(&self.config.directory, report.id, now, &file_name);
        let disk = self.storage.disk(&self.config.disk).await?;

        let size = upload(disk.as_ref(), &key, artifact.path()).await?;
        let row_count = artifact.row_count as i64;
        drop(artifact);

        let record = CreateReportFile {
            report_id: report.id,
            file_name,
            file_path: key.clone(),
            disk: self.config.disk.clone(),
            file_size: size as i64,
            mime_type: format.mime_type().to_string(),
            format,
            row_count,
            generated_by: requested_by,
            expires_at: Some(now + Duration::days(self.config.file_ttl_days)),
        };

        match self.files.create(&record).await {
            Ok(file) => Ok(file),
            Err(err) => {
                if let Err(cleanup_err) = disk.delete(&key).await {
                    tracing::error!(
                        path = %key,
                        error = %cleanup_err,
                        "Failed to remove stored report after insert failure"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Upload `local` to `{key}.part`, then rename it into place.
async fn upload(
    disk: &dyn StorageProvider,
    key: &str,
    local: &std::path::Path,
) -> AppResult<u64> {
    let part = format!("{key}.part");
    let size = disk.put_file(&part, local).await?;
    if let Err(err) = disk.rename(&part, key).await {
        if let Err(cleanup_err) = disk.delete(&part).await {
            tracing::warn!(path = %part, error = %cleanup_err, "Failed to remove partial upload");
        }
        return Err(err);
    }
    Ok(size)
}

/// Lowercase ASCII slug of a report name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    let slug: String = slug.trim_end_matches('_').chars().take(60).collect();
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug.to_string()
    }
}

/// `{slug}_{HHMMSS}_{short id}.{ext}`
pub fn file_name(report_name: &str, format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}.{}",
        slugify(report_name),
        now.format("%H%M%S"),
        ReportFileId::new().short(),
        format.extension()
    )
}

/// `{directory}/{report_id}/{YYYY-MM-DD}/{file_name}`
pub fn storage_key(
    directory: &str,
    report_id: ReportId,
    now: DateTime<Utc>,
    file_name: &str,
) -> String {
    format!(
        "{}/{}/{}/{}",
        directory.trim_matches('/'),
        report_id,
        now.format("%Y-%m-%d"),
        file_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixture::{self, Fixture};
    use assetdesk_core::error::ErrorKind;
    use chrono::TimeZone;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Deployed Assets (Q1)"), "deployed_assets_q1");
        assert_eq!(slugify("  --  "), "report");
        assert_eq!(slugify("Über Report"), "ber_report");
    }

    #[test]
    fn test_storage_key_layout() {
        let id = ReportId::new();
        let now = Utc.with_ymd_and_hms(2024, 5, 14, 13, 4, 5).unwrap();
        let name = file_name("Assets", ExportFormat::Xlsx, now);
        assert!(name.starts_with("assets_130405_"));
        assert!(name.ends_with(".xlsx"));
        assert_eq!(
            storage_key("reports/", id, now, &name),
            format!("reports/{id}/2024-05-14/{name}")
        );
    }

    #[tokio::test]
    async fn test_generate_stores_file_and_marks_completed() {
        let fx = Fixture::new().await;
        let owner = UserId::new();
        let report = fx.insert_report(fixture::report(owner)).await;

        let file = fx
            .generator()
            .generate(&report, ExportFormat::Csv, Some(owner))
            .await
            .unwrap();

        assert_eq!(file.row_count, 5);
        assert_eq!(file.generated_by, Some(owner));
        assert!(file.file_path.starts_with(&format!("reports/{}/", report.id)));
        let stored = std::fs::read_to_string(fx.disk_path(&file.file_path)).unwrap();
        assert!(stored.starts_with("Asset Tag,Name\n"));
        assert_eq!(stored.lines().count(), 6);
        assert_eq!(file.file_size as usize, stored.len());
        assert!(!fx.disk_path(&format!("{}.part", file.file_path)).exists());

        let ttl = file.expires_at.unwrap() - file.created_at;
        assert!((ttl.num_hours() - 7 * 24).abs() <= 1);

        let stored_report = fx.reports.raw(report.id).await.unwrap();
        assert_eq!(stored_report.status, ReportStatus::Completed);
        assert!(stored_report.error_message.is_none());
    }

    #[tokio::test]
    async fn test_failed_insert_removes_stored_object() {
        let fx = Fixture::new().await;
        let report = fx.insert_report(fixture::report(UserId::new())).await;
        fx.files.fail_inserts(true);

        let err = fx
            .generator()
            .generate(&report, ExportFormat::Csv, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Database);
        let report_dir = fx.disk_path(&format!("reports/{}", report.id));
        let leftovers: Vec<_> = walk(&report_dir);
        assert!(leftovers.is_empty(), "{leftovers:?}");

        let stored_report = fx.reports.raw(report.id).await.unwrap();
        assert_eq!(stored_report.status, ReportStatus::Failed);
        assert_eq!(stored_report.error_message.as_deref(), Some(err.message.as_str()));
    }

    #[tokio::test]
    async fn test_missing_report_is_not_found() {
        let fx = Fixture::new().await;
        let err = fx
            .generator()
            .generate_by_id(ReportId::new(), ExportFormat::Pdf, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    fn walk(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .flat_map(|e| {
                let path = e.path();
                if path.is_dir() { walk(&path) } else { vec![path] }
            })
            .collect()
    }
}
