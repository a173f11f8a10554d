//! `report_cleanup`: sweep expired report files.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use assetdesk_core::AppError;
use assetdesk_core::config::ReportsConfig;
use assetdesk_entity::job::{Job, JobPayload, REPORT_CLEANUP};
use assetdesk_service::{CleanupOptions, CleanupService};

use crate::executor::{JobExecutionError, JobHandler, decode_payload};

/// Runs the cleanup sweep with the configured retention and batch size
#[derive(Debug, Clone)]
pub struct ReportCleanupHandler {
    cleanup: CleanupService,
    config: ReportsConfig,
}

impl ReportCleanupHandler {
    /// Create a new handler
    pub fn new(cleanup: CleanupService, config: ReportsConfig) -> Self {
        Self { cleanup, config }
    }

    fn options(&self, days: Option<i64>, dry_run: bool) -> CleanupOptions {
        let retention = self.config.cleanup_retention_days;
        CleanupOptions {
            days: days.or((retention > 0).then_some(retention)),
            dry_run,
            batch_size: self.config.cleanup_batch_size,
        }
    }
}

#[async_trait]
impl JobHandler for ReportCleanupHandler {
    fn job_type(&self) -> &'static str {
        REPORT_CLEANUP
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::ReportCleanup { days, dry_run } = decode_payload(job)? else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} is not a report cleanup job",
                job.id
            )));
        };

        let summary = self
            .cleanup
            .run(self.options(days, dry_run), Utc::now())
            .await?;
        if summary.failed > 0 {
            tracing::warn!(
                job_id = %job.id,
                failed = summary.failed,
                "Report cleanup left files behind"
            );
        }
        let value = serde_json::to_value(summary).map_err(AppError::from)?;
        Ok(Some(value))
    }
}
