//! `report_generation`: produce one file for a report.

use async_trait::async_trait;
use serde_json::{Value, json};

use assetdesk_entity::job::{Job, JobPayload, REPORT_GENERATION};
use assetdesk_service::ReportGenerator;

use crate::executor::{JobExecutionError, JobHandler, decode_payload};

/// Runs the report generator for queued exports and scheduled runs
#[derive(Debug, Clone)]
pub struct ReportGenerationHandler {
    generator: ReportGenerator,
}

impl ReportGenerationHandler {
    /// Create a new handler
    pub fn new(generator: ReportGenerator) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl JobHandler for ReportGenerationHandler {
    fn job_type(&self) -> &'static str {
        REPORT_GENERATION
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::ReportGeneration {
            report_id,
            format,
            requested_by,
        } = decode_payload(job)?
        else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} is not a report generation job",
                job.id
            )));
        };

        let file = self
            .generator
            .generate_by_id(report_id, format, requested_by)
            .await?;

        Ok(Some(json!({
            "report_id": report_id,
            "file_id": file.id,
            "file_name": file.file_name,
            "row_count": file.row_count,
            "file_size": file.file_size,
        })))
    }

    async fn on_abandoned(&self, job: &Job, reason: &str) {
        let Ok(JobPayload::ReportGeneration { report_id, .. }) = decode_payload(job) else {
            return;
        };
        if let Err(err) = self.generator.mark_failed(report_id, reason).await {
            tracing::error!(
                job_id = %job.id,
                report_id = %report_id,
                error = %err,
                "Failed to mark abandoned report run"
            );
        }
    }
}
