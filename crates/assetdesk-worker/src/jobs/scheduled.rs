//! `scheduled_report_check`: dispatch due scheduled reports.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use assetdesk_core::AppError;
use assetdesk_entity::job::{Job, SCHEDULED_REPORT_CHECK};
use assetdesk_service::DispatchService;

use crate::executor::{JobExecutionError, JobHandler, decode_payload};

/// Runs one dispatcher pass
#[derive(Debug, Clone)]
pub struct ScheduledReportCheckHandler {
    dispatcher: DispatchService,
}

impl ScheduledReportCheckHandler {
    /// Create a new handler
    pub fn new(dispatcher: DispatchService) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl JobHandler for ScheduledReportCheckHandler {
    fn job_type(&self) -> &'static str {
        SCHEDULED_REPORT_CHECK
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        decode_payload(job)?;
        let summary = self.dispatcher.run(Utc::now()).await?;
        let value = serde_json::to_value(summary).map_err(AppError::from)?;
        Ok(Some(value))
    }
}
