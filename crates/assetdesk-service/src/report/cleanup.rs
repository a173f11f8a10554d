//! Expired report file sweep.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use assetdesk_core::AppError;
use assetdesk_core::result::AppResult;
use assetdesk_core::traits::storage::StorageProvider;
use assetdesk_core::types::ReportFileId;
use assetdesk_database::ReportFileStore;
use assetdesk_entity::report_file::ReportFile;
use assetdesk_storage::StorageManager;

/// Parameters of one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOptions {
    /// Only delete files that expired at least this many days ago.
    pub days: Option<i64>,
    /// Count without deleting.
    pub dry_run: bool,
    /// Rows fetched per batch.
    pub batch_size: i64,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            days: None,
            dry_run: false,
            batch_size: 100,
        }
    }
}

impl CleanupOptions {
    /// Files with `expires_at` at or before the returned instant are eligible.
    ///
    /// A `days` value that reaches past the representable date range is a
    /// validation error.
    pub fn cutoff(&self, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        match self.days {
            Some(days) if days > 0 => TimeDelta::try_days(days)
                .and_then(|age| now.checked_sub_signed(age))
                .ok_or_else(|| {
                    AppError::validation(format!("Cleanup age of {days} days is out of range"))
                }),
            _ => Ok(now),
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupSummary {
    /// Eligible files examined.
    pub scanned: u64,
    /// Files whose object and row were both removed (or would be, in a dry run).
    pub deleted: u64,
    /// Files where either removal failed.
    pub failed: u64,
    /// Bytes removed (or removable, in a dry run).
    pub bytes_freed: u64,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Empty directories removed.
    pub pruned_dirs: u64,
}

/// Deletes expired report files from storage and the database.
#[derive(Debug, Clone)]
pub struct CleanupService {
    files: Arc<dyn ReportFileStore>,
    storage: Arc<StorageManager>,
    directory: String,
}

impl CleanupService {
    /// Creates a sweep over files stored under `directory` on each disk.
    pub fn new(
        files: Arc<dyn ReportFileStore>,
        storage: Arc<StorageManager>,
        directory: impl Into<String>,
    ) -> Self {
        Self {
            files,
            storage,
            directory: directory.into().trim_matches('/').to_string(),
        }
    }

    /// Sweep files expired relative to `now`.
    ///
    /// Failures on individual files are logged and counted; the sweep carries
    /// on with the next file. Only listing failures abort it.
    pub async fn run(&self, options: CleanupOptions, now: DateTime<Utc>) -> AppResult<CleanupSummary> {
        let cutoff = options.cutoff(now)?;
        let batch_size = options.batch_size.max(1);
        let mut summary = CleanupSummary {
            dry_run: options.dry_run,
            ..CleanupSummary::default()
        };
        let mut disks: HashMap<String, Arc<dyn StorageProvider>> = HashMap::new();
        let mut after: Option<ReportFileId> = None;

        tracing::info!(
            cutoff = %cutoff,
            dry_run = options.dry_run,
            batch_size,
            "Report cleanup started"
        );

        loop {
            let batch = self.files.find_expired_batch(cutoff, after, batch_size).await?;
            let Some(last) = batch.last() else {
                break;
            };
            after = Some(last.id);
            let full = batch.len() as i64 == batch_size;

            for file in &batch {
                summary.scanned += 1;
                if options.dry_run {
                    summary.deleted += 1;
                    summary.bytes_freed += file.file_size.max(0) as u64;
                    continue;
                }
                match self.remove(file, &mut disks).await {
                    Ok(pruned) => {
                        summary.deleted += 1;
                        summary.bytes_freed += file.file_size.max(0) as u64;
                        summary.pruned_dirs += pruned;
                    }
                    Err(err) => {
                        tracing::warn!(
                            file_id = %file.id,
                            path = %file.file_path,
                            error = %err,
                            "Failed to delete expired report file"
                        );
                        summary.failed += 1;
                    }
                }
            }

            if !full {
                break;
            }
        }

        tracing::info!(
            scanned = summary.scanned,
            deleted = summary.deleted,
            failed = summary.failed,
            bytes_freed = summary.bytes_freed,
            pruned_dirs = summary.pruned_dirs,
            dry_run = summary.dry_run,
            "Report cleanup finished"
        );
        Ok(summary)
    }

    async fn disk(
        &self,
        name: &str,
        disks: &mut HashMap<String, Arc<dyn StorageProvider>>,
    ) -> AppResult<Arc<dyn StorageProvider>> {
        if let Some(disk) = disks.get(name) {
            return Ok(Arc::clone(disk));
        }
        let disk = self.storage.disk(name).await?;
        disks.insert(name.to_string(), Arc::clone(&disk));
        Ok(disk)
    }

    /// Delete the object, then the row, then prune empty parents.
    async fn remove(
        &self,
        file: &ReportFile,
        disks: &mut HashMap<String, Arc<dyn StorageProvider>>,
    ) -> AppResult<u64> {
        let disk = self.disk(&file.disk, disks).await?;
        disk.delete(&file.file_path).await?;
        if !self.files.delete(file.id).await? {
            return Err(AppError::not_found(format!(
                "Report file row {} already removed",
                file.id
            )));
        }
        Ok(self.prune(disk.as_ref(), &file.file_path).await)
    }

    /// Remove empty directories above `path`, stopping at the reports root.
    async fn prune(&self, disk: &dyn StorageProvider, path: &str) -> u64 {
        let mut pruned = 0;
        let mut current = parent(path);
        while let Some(dir) = current {
            if dir == self.directory || !dir.starts_with(&format!("{}/", self.directory)) {
                break;
            }
            match disk.remove_empty_dir(dir).await {
                Ok(true) => {
                    pruned += 1;
                    current = parent(dir);
                }
                Ok(false) => break,
                Err(err) => {
                    tracing::debug!(dir = %dir, error = %err, "Stopped pruning report directories");
                    break;
                }
            }
        }
        pruned
    }
}

fn parent(path: &str) -> Option<&str> {
    path.rfind('/').map(|i| &path[..i]).filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixture::Fixture;
    use assetdesk_core::types::ReportId;
    use assetdesk_entity::report::ExportFormat;
    use assetdesk_core::error::ErrorKind;
    use assetdesk_database::memory::MemoryReportFileStore;
    use assetdesk_entity::report_file::CreateReportFile;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Duration;

    /// File store whose row delete fails for one file.
    #[derive(Debug)]
    struct RowDeleteFails {
        inner: Arc<MemoryReportFileStore>,
        fail_on: ReportFileId,
    }

    #[async_trait]
    impl ReportFileStore for RowDeleteFails {
        async fn create(&self, data: &CreateReportFile) -> AppResult<ReportFile> {
            self.inner.create(data).await
        }

        async fn find_by_id(&self, id: ReportFileId) -> AppResult<Option<ReportFile>> {
            self.inner.find_by_id(id).await
        }

        async fn list_by_report(&self, report_id: ReportId) -> AppResult<Vec<ReportFile>> {
            self.inner.list_by_report(report_id).await
        }

        async fn delete(&self, id: ReportFileId) -> AppResult<bool> {
            if id == self.fail_on {
                return Err(AppError::database("connection reset"));
            }
            self.inner.delete(id).await
        }

        async fn find_expired_batch(
            &self,
            cutoff: DateTime<Utc>,
            after: Option<ReportFileId>,
            limit: i64,
        ) -> AppResult<Vec<ReportFile>> {
            self.inner.find_expired_batch(cutoff, after, limit).await
        }
    }

    async fn stored_file(fx: &Fixture, report_id: ReportId, name: &str, expires_at: DateTime<Utc>) -> ReportFile {
        let path = format!("reports/{report_id}/2024-05-01/{name}");
        let disk = fx.storage.disk("local").await.unwrap();
        disk.write(&path, Bytes::from_static(b"a,b\n1,2\n")).await.unwrap();
        let file = ReportFile {
            id: ReportFileId::new(),
            report_id,
            file_name: name.to_string(),
            file_path: path,
            disk: "local".to_string(),
            file_size: 8,
            mime_type: "text/csv".to_string(),
            format: ExportFormat::Csv,
            row_count: 1,
            generated_by: None,
            expires_at: Some(expires_at),
            created_at: expires_at - Duration::days(7),
        };
        fx.files.insert(file.clone()).await;
        file
    }

    fn service(fx: &Fixture) -> CleanupService {
        CleanupService::new(fx.files.clone(), fx.storage.clone(), "reports")
    }

    #[test]
    fn test_cutoff_rejects_out_of_range_days() {
        let now = Utc::now();
        let options = CleanupOptions {
            days: Some(100_000_000),
            ..CleanupOptions::default()
        };
        let err = options.cutoff(now).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let week = CleanupOptions {
            days: Some(7),
            ..CleanupOptions::default()
        };
        assert_eq!(week.cutoff(now).unwrap(), now - Duration::days(7));
        assert_eq!(CleanupOptions::default().cutoff(now).unwrap(), now);
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("reports/a/b.csv"), Some("reports/a"));
        assert_eq!(parent("reports"), None);
    }

    #[tokio::test]
    async fn test_days_filter_uses_expiry_time() {
        let fx = Fixture::new().await;
        let now = Utc::now();
        let report_id = ReportId::new();
        let old = stored_file(&fx, report_id, "old.csv", now - Duration::days(10)).await;
        let mid = stored_file(&fx, report_id, "mid.csv", now - Duration::days(5)).await;
        let new = stored_file(&fx, report_id, "new.csv", now - Duration::days(1)).await;

        let options = CleanupOptions {
            days: Some(7),
            ..CleanupOptions::default()
        };
        let summary = service(&fx).run(options, now).await.unwrap();

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.bytes_freed, 8);
        assert!(!fx.disk_path(&old.file_path).exists());
        assert!(fx.disk_path(&mid.file_path).exists());
        assert!(fx.disk_path(&new.file_path).exists());
        assert_eq!(fx.files.len().await, 2);
    }

    #[tokio::test]
    async fn test_second_run_deletes_nothing() {
        let fx = Fixture::new().await;
        let now = Utc::now();
        let report_id = ReportId::new();
        for i in 0..5 {
            stored_file(&fx, report_id, &format!("f{i}.csv"), now - Duration::hours(i + 1)).await;
        }
        stored_file(&fx, report_id, "live.csv", now + Duration::days(1)).await;
        let options = CleanupOptions {
            batch_size: 2,
            ..CleanupOptions::default()
        };

        let first = service(&fx).run(options, now).await.unwrap();
        assert_eq!(first.deleted, 5);
        assert_eq!(first.failed, 0);

        let second = service(&fx).run(options, now).await.unwrap();
        assert_eq!(second.scanned, 0);
        assert_eq!(second.deleted, 0);
        assert_eq!(fx.files.len().await, 1);
    }

    #[tokio::test]
    async fn test_dry_run_mutates_nothing() {
        let fx = Fixture::new().await;
        let now = Utc::now();
        let file = stored_file(&fx, ReportId::new(), "a.csv", now - Duration::days(1)).await;

        let options = CleanupOptions {
            dry_run: true,
            ..CleanupOptions::default()
        };
        let summary = service(&fx).run(options, now).await.unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.bytes_freed, 8);
        assert!(fx.disk_path(&file.file_path).exists());
        assert_eq!(fx.files.len().await, 1);
    }

    #[tokio::test]
    async fn test_prunes_empty_directories_but_keeps_root() {
        let fx = Fixture::new().await;
        let now = Utc::now();
        let report_id = ReportId::new();
        stored_file(&fx, report_id, "a.csv", now - Duration::days(1)).await;

        let summary = service(&fx).run(CleanupOptions::default(), now).await.unwrap();

        assert_eq!(summary.pruned_dirs, 2);
        assert!(!fx.disk_path(&format!("reports/{report_id}")).exists());
        assert!(fx.disk_path("reports").exists());
    }

    #[tokio::test]
    async fn test_missing_disk_counts_as_failure() {
        let fx = Fixture::new().await;
        let now = Utc::now();
        let mut file = stored_file(&fx, ReportId::new(), "a.csv", now - Duration::days(1)).await;
        file.id = ReportFileId::new();
        file.disk = "s3".to_string();
        fx.files.insert(file).await;

        let summary = service(&fx).run(CleanupOptions::default(), now).await.unwrap();

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_row_delete_failure_does_not_stop_the_sweep() {
        let fx = Fixture::new().await;
        let now = Utc::now();
        let report_id = ReportId::new();
        let mut stored = Vec::new();
        for i in 0..5 {
            stored.push(stored_file(&fx, report_id, &format!("f{i}.csv"), now - Duration::days(1)).await);
        }
        let broken = stored[2].id;
        let files = Arc::new(RowDeleteFails {
            inner: fx.files.clone(),
            fail_on: broken,
        });
        let sweep = CleanupService::new(files, fx.storage.clone(), "reports");
        let options = CleanupOptions {
            batch_size: 2,
            ..CleanupOptions::default()
        };

        let summary = sweep.run(options, now).await.unwrap();

        assert_eq!(summary.scanned, 5);
        assert_eq!(summary.deleted, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.bytes_freed, 32);
        assert_eq!(fx.files.len().await, 1);
        assert!(fx.files.find_by_id(broken).await.unwrap().is_some());
        for file in stored.iter().filter(|f| f.id != broken) {
            assert!(!fx.disk_path(&file.file_path).exists());
        }
    }
}
