//! In-memory report definition store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use assetdesk_core::AppError;
use assetdesk_core::result::AppResult;
use assetdesk_core::types::{PageRequest, PageResponse, ReportId, UserId};
use assetdesk_entity::report::{ReportDefinition, ReportStatus};

use crate::store::ReportStore;

/// Report definitions held in a map.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: RwLock<HashMap<ReportId, ReportDefinition>>,
}

impl MemoryReportStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a definition including soft-deleted ones.
    pub async fn raw(&self, id: ReportId) -> Option<ReportDefinition> {
        self.reports.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn find_by_id(&self, id: ReportId) -> AppResult<Option<ReportDefinition>> {
        Ok(self
            .reports
            .read()
            .await
            .get(&id)
            .filter(|r| !r.is_deleted())
            .cloned())
    }

    async fn list_visible(
        &self,
        viewer: Option<UserId>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ReportDefinition>> {
        let reports = self.reports.read().await;
        let mut visible: Vec<ReportDefinition> = reports
            .values()
            .filter(|r| !r.is_deleted())
            .filter(|r| viewer.is_none_or(|v| r.owner_id == v || r.is_public))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = visible.len() as u64;
        let items = visible
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }

    async fn create(&self, report: &ReportDefinition) -> AppResult<ReportDefinition> {
        let mut reports = self.reports.write().await;
        if reports.contains_key(&report.id) {
            return Err(AppError::conflict(format!("Report {} already exists", report.id)));
        }
        reports.insert(report.id, report.clone());
        Ok(report.clone())
    }

    async fn update(&self, report: &ReportDefinition) -> AppResult<ReportDefinition> {
        let mut reports = self.reports.write().await;
        let current = reports
            .get_mut(&report.id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| AppError::not_found(format!("Report {} not found", report.id)))?;
        let mut next = report.clone();
        next.status = current.status;
        next.last_run_at = current.last_run_at;
        next.error_message = current.error_message.clone();
        next.owner_id = current.owner_id;
        next.created_at = current.created_at;
        next.deleted_at = None;
        *current = next.clone();
        Ok(next)
    }

    async fn soft_delete(&self, id: ReportId, now: DateTime<Utc>) -> AppResult<bool> {
        let mut reports = self.reports.write().await;
        match reports.get_mut(&id).filter(|r| !r.is_deleted()) {
            Some(report) => {
                report.deleted_at = Some(now);
                report.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_active_scheduled(&self) -> AppResult<Vec<ReportDefinition>> {
        let mut scheduled: Vec<ReportDefinition> = self
            .reports
            .read()
            .await
            .values()
            .filter(|r| r.is_scheduled && !r.is_deleted())
            .cloned()
            .collect();
        scheduled.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(scheduled)
    }

    async fn claim_for_run(
        &self,
        id: ReportId,
        observed_last_run: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut reports = self.reports.write().await;
        match reports.get_mut(&id).filter(|r| {
            !r.is_deleted()
                && r.last_run_at == observed_last_run
                && (r.status != ReportStatus::Processing || r.updated_at < stale_before)
        }) {
            Some(report) => {
                report.status = ReportStatus::Processing;
                report.last_run_at = Some(now);
                report.error_message = None;
                report.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_status(
        &self,
        id: ReportId,
        status: ReportStatus,
        error_message: Option<&str>,
    ) -> AppResult<()> {
        let mut reports = self.reports.write().await;
        if let Some(report) = reports.get_mut(&id) {
            report.status = status;
            report.error_message = error_message.map(str::to_string);
            report.updated_at = Utc::now();
        }
        Ok(())
    }
}
