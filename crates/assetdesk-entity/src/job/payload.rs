//! Typed job payload definitions.

use serde::{Deserialize, Serialize};

use assetdesk_core::types::{ReportId, UserId};

use crate::report::ExportFormat;

/// Job type of [`JobPayload::ReportGeneration`].
pub const REPORT_GENERATION: &str = "report_generation";
/// Job type of [`JobPayload::ScheduledReportCheck`].
pub const SCHEDULED_REPORT_CHECK: &str = "scheduled_report_check";
/// Job type of [`JobPayload::ReportCleanup`].
pub const REPORT_CLEANUP: &str = "report_cleanup";

/// Typed payloads for known job types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job_type")]
pub enum JobPayload {
    /// Generate one file for a report.
    #[serde(rename = "report_generation")]
    ReportGeneration {
        /// Report to generate.
        report_id: ReportId,
        /// Output format.
        format: ExportFormat,
        /// User who asked for it; `None` for scheduled runs.
        #[serde(default)]
        requested_by: Option<UserId>,
    },
    /// Scan scheduled reports and dispatch the due ones.
    #[serde(rename = "scheduled_report_check")]
    ScheduledReportCheck,
    /// Delete expired report files.
    #[serde(rename = "report_cleanup")]
    ReportCleanup {
        /// Extra days past expiry.
        #[serde(default)]
        days: Option<i64>,
        /// Only count, never delete.
        #[serde(default)]
        dry_run: bool,
    },
}

impl JobPayload {
    /// The job type string stored in the `jobs` table.
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::ReportGeneration { .. } => REPORT_GENERATION,
            Self::ScheduledReportCheck => SCHEDULED_REPORT_CHECK,
            Self::ReportCleanup { .. } => REPORT_CLEANUP,
        }
    }

    /// Decode a stored payload for `job_type`.
    ///
    /// Stored payloads omit the tag, so it is re-inserted before decoding.
    pub fn decode(job_type: &str, payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut tagged = match payload {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        tagged.insert(
            "job_type".to_string(),
            serde_json::Value::String(job_type.to_string()),
        );
        serde_json::from_value(serde_json::Value::Object(tagged))
    }

    /// Encode to the stored form (without the tag).
    pub fn encode(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.remove("job_type");
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_payload_decodes_from_stored_form() {
        let report_id = ReportId::new();
        let payload = JobPayload::ReportGeneration {
            report_id,
            format: ExportFormat::Xlsx,
            requested_by: None,
        };
        let stored = payload.encode().unwrap();
        assert!(stored.get("job_type").is_none());
        let decoded = JobPayload::decode(REPORT_GENERATION, &stored).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_unit_payload_from_empty_object() {
        let decoded =
            JobPayload::decode(SCHEDULED_REPORT_CHECK, &serde_json::json!({})).unwrap();
        assert_eq!(decoded, JobPayload::ScheduledReportCheck);
    }

    #[test]
    fn test_cleanup_defaults() {
        let decoded = JobPayload::decode(REPORT_CLEANUP, &serde_json::json!({})).unwrap();
        assert_eq!(
            decoded,
            JobPayload::ReportCleanup {
                days: None,
                dry_run: false
            }
        );
    }
}
