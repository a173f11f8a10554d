//! Report run status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the most recent run of a report definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Never run.
    #[default]
    Pending,
    /// Claimed by the scheduler or a worker.
    Processing,
    /// Last run produced a file.
    Completed,
    /// Last run failed; see `error_message`.
    Failed,
}

impl ReportStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
