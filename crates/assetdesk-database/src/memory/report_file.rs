//! In-memory report file store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use assetdesk_core::AppError;
use assetdesk_core::result::AppResult;
use assetdesk_core::types::{ReportFileId, ReportId};
use assetdesk_entity::report_file::{CreateReportFile, ReportFile};

use crate::store::ReportFileStore;

/// Report files ordered by id, matching the keyset order of the SQL store.
#[derive(Debug, Default)]
pub struct MemoryReportFileStore {
    files: RwLock<BTreeMap<ReportFileId, ReportFile>>,
    fail_inserts: AtomicBool,
}

impl MemoryReportFileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed row, bypassing `create`.
    pub async fn insert(&self, file: ReportFile) {
        self.files.write().await.insert(file.id, file);
    }

    /// Make every subsequent `create` fail with a database error.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl ReportFileStore for MemoryReportFileStore {
    async fn create(&self, data: &CreateReportFile) -> AppResult<ReportFile> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::database("Failed to record report file"));
        }
        let file = ReportFile {
            id: ReportFileId::new(),
            report_id: data.report_id,
            file_name: data.file_name.clone(),
            file_path: data.file_path.clone(),
            disk: data.disk.clone(),
            file_size: data.file_size,
            mime_type: data.mime_type.clone(),
            format: data.format,
            row_count: data.row_count,
            generated_by: data.generated_by,
            expires_at: data.expires_at,
            created_at: Utc::now(),
        };
        self.files.write().await.insert(file.id, file.clone());
        Ok(file)
    }

    async fn find_by_id(&self, id: ReportFileId) -> AppResult<Option<ReportFile>> {
        Ok(self.files.read().await.get(&id).cloned())
    }

    async fn list_by_report(&self, report_id: ReportId) -> AppResult<Vec<ReportFile>> {
        let mut files: Vec<ReportFile> = self
            .files
            .read()
            .await
            .values()
            .filter(|f| f.report_id == report_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    async fn delete(&self, id: ReportFileId) -> AppResult<bool> {
        Ok(self.files.write().await.remove(&id).is_some())
    }

    async fn find_expired_batch(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<ReportFileId>,
        limit: i64,
    ) -> AppResult<Vec<ReportFile>> {
        let files = self.files.read().await;
        Ok(files
            .values()
            .filter(|f| after.is_none_or(|a| f.id > a))
            .filter(|f| f.expires_at.is_some_and(|e| e <= cutoff))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
