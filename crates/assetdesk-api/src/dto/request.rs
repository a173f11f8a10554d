//! Request DTOs with validation.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use assetdesk_core::types::{FilterField, SortDirection};
use assetdesk_entity::report::{CreateReport, ExportFormat, Frequency, ReportKind, UpdateReport};

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Create report request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReportRequest {
    /// Display name.
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Data source.
    pub kind: ReportKind,
    /// Default output format.
    #[serde(default)]
    pub format: ExportFormat,
    /// Columns; empty uses the data source's defaults.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Filter conditions.
    #[serde(default)]
    pub filters: Vec<FilterField>,
    /// Sort field.
    #[serde(default)]
    pub sort_field: Option<String>,
    /// Sort direction.
    #[serde(default)]
    pub sort_direction: SortDirection,
    /// Scheduling switch.
    #[serde(default)]
    pub is_scheduled: bool,
    /// daily, weekly or monthly.
    #[serde(default)]
    pub frequency: Option<Frequency>,
    /// Weekday name or day of month.
    #[serde(default)]
    pub schedule_day: Option<String>,
    /// `HH:MM[:SS]` in UTC.
    #[serde(default)]
    pub schedule_time: Option<NaiveTime>,
    /// Public visibility.
    #[serde(default)]
    pub is_public: bool,
}

impl From<CreateReportRequest> for CreateReport {
    fn from(req: CreateReportRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            description: req.description,
            kind: req.kind,
            format: req.format,
            columns: req.columns,
            filters: req.filters,
            sort_field: req.sort_field,
            sort_direction: req.sort_direction,
            is_scheduled: req.is_scheduled,
            frequency: req.frequency,
            schedule_day: req.schedule_day,
            schedule_time: req.schedule_time,
            is_public: req.is_public,
        }
    }
}

/// Update report request body. Absent fields stay unchanged; `null` clears
/// nullable ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateReportRequest {
    /// Display name.
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub kind: Option<ReportKind>,
    pub format: Option<ExportFormat>,
    pub columns: Option<Vec<String>>,
    pub filters: Option<Vec<FilterField>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub sort_field: Option<Option<String>>,
    pub sort_direction: Option<SortDirection>,
    pub is_scheduled: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub frequency: Option<Option<Frequency>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub schedule_day: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub schedule_time: Option<Option<NaiveTime>>,
    pub is_public: Option<bool>,
}

impl From<UpdateReportRequest> for UpdateReport {
    fn from(req: UpdateReportRequest) -> Self {
        Self {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            kind: req.kind,
            format: req.format,
            columns: req.columns,
            filters: req.filters,
            sort_field: req.sort_field,
            sort_direction: req.sort_direction,
            is_scheduled: req.is_scheduled,
            frequency: req.frequency,
            schedule_day: req.schedule_day,
            schedule_time: req.schedule_time,
            is_public: req.is_public,
        }
    }
}

/// Export request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Output format; defaults to the report's own.
    #[serde(default)]
    pub format: Option<ExportFormat>,
}
