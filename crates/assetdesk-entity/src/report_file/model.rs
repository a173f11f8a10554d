//! Report file entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use assetdesk_core::types::{ReportFileId, ReportId, UserId};

use crate::report::ExportFormat;

/// A generated report file stored on a disk under `reports/`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReportFile {
    /// Unique file identifier.
    pub id: ReportFileId,
    /// The report this file was generated from.
    pub report_id: ReportId,
    /// Download file name.
    pub file_name: String,
    /// Storage-relative path.
    pub file_path: String,
    /// Disk holding the object.
    pub disk: String,
    /// Size in bytes.
    pub file_size: i64,
    /// MIME type.
    pub mime_type: String,
    /// Output format.
    pub format: ExportFormat,
    /// Number of data rows written.
    pub row_count: i64,
    /// User who requested the file; `None` for scheduled runs.
    pub generated_by: Option<UserId>,
    /// When the file stops being downloadable.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the file was recorded.
    pub created_at: DateTime<Utc>,
}

impl ReportFile {
    /// Whether the file is expired at `now`. The boundary is inclusive.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

/// Data required to record a generated file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReportFile {
    /// Owning report.
    pub report_id: ReportId,
    /// Download file name.
    pub file_name: String,
    /// Storage-relative path.
    pub file_path: String,
    /// Disk holding the object.
    pub disk: String,
    /// Size in bytes.
    pub file_size: i64,
    /// MIME type.
    pub mime_type: String,
    /// Output format.
    pub format: ExportFormat,
    /// Number of data rows.
    pub row_count: i64,
    /// Requesting user.
    pub generated_by: Option<UserId>,
    /// Expiry.
    pub expires_at: Option<DateTime<Utc>>,
}
