//! Report definition entity model.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use assetdesk_core::types::{FilterField, ReportId, SortDirection, UserId};

use super::format::ExportFormat;
use super::kind::ReportKind;
use super::schedule::{Frequency, Schedule};
use super::status::ReportStatus;

/// A saved report definition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReportDefinition {
    /// Unique report identifier.
    pub id: ReportId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Data source.
    pub kind: ReportKind,
    /// Default output format.
    pub format: ExportFormat,
    /// Ordered column list.
    pub columns: Json<Vec<String>>,
    /// Filter conditions, all of which must hold.
    pub filters: Json<Vec<FilterField>>,
    /// Sort field; `None` uses the kind's default.
    pub sort_field: Option<String>,
    /// Sort direction.
    pub sort_direction: SortDirection,
    /// Whether the scheduler runs this report.
    pub is_scheduled: bool,
    /// Run frequency.
    pub frequency: Option<Frequency>,
    /// Weekday name or day of month.
    pub schedule_day: Option<String>,
    /// Time of day (UTC).
    pub schedule_time: Option<NaiveTime>,
    /// When the last run was claimed.
    pub last_run_at: Option<DateTime<Utc>>,
    /// Status of the last run.
    pub status: ReportStatus,
    /// Error from the last failed run.
    pub error_message: Option<String>,
    /// Owning user.
    pub owner_id: UserId,
    /// Whether every user may view and export this report.
    pub is_public: bool,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// When the report was last updated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ReportDefinition {
    /// The parsed schedule triple.
    pub fn schedule(&self) -> Schedule {
        Schedule::from_stored(
            self.frequency,
            self.schedule_day.as_deref(),
            self.schedule_time,
        )
    }

    /// Check if the definition has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check if `user` owns this definition.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }
}

/// Data required to create a report definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReport {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Data source.
    pub kind: ReportKind,
    /// Default output format.
    pub format: ExportFormat,
    /// Ordered column list; empty uses the kind's defaults.
    pub columns: Vec<String>,
    /// Filter conditions.
    pub filters: Vec<FilterField>,
    /// Sort field.
    pub sort_field: Option<String>,
    /// Sort direction.
    pub sort_direction: SortDirection,
    /// Whether the scheduler runs this report.
    pub is_scheduled: bool,
    /// Run frequency.
    pub frequency: Option<Frequency>,
    /// Weekday name or day of month.
    pub schedule_day: Option<String>,
    /// Time of day (UTC).
    pub schedule_time: Option<NaiveTime>,
    /// Public visibility.
    pub is_public: bool,
}

impl CreateReport {
    /// Materialize a new pending definition owned by `owner`.
    pub fn into_definition(self, owner: UserId, now: DateTime<Utc>) -> ReportDefinition {
        let columns = if self.columns.is_empty() {
            self.kind
                .default_columns()
                .iter()
                .map(|c| c.to_string())
                .collect()
        } else {
            self.columns
        };
        ReportDefinition {
            id: ReportId::new(),
            name: self.name,
            description: self.description,
            kind: self.kind,
            format: self.format,
            columns: Json(columns),
            filters: Json(self.filters),
            sort_field: self.sort_field,
            sort_direction: self.sort_direction,
            is_scheduled: self.is_scheduled,
            frequency: self.frequency,
            schedule_day: self.schedule_day,
            schedule_time: self.schedule_time,
            last_run_at: None,
            status: ReportStatus::Pending,
            error_message: None,
            owner_id: owner,
            is_public: self.is_public,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Partial update of a report definition. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReport {
    /// Display name.
    pub name: Option<String>,
    /// Description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// Data source.
    pub kind: Option<ReportKind>,
    /// Default output format.
    pub format: Option<ExportFormat>,
    /// Column list.
    pub columns: Option<Vec<String>>,
    /// Filter conditions.
    pub filters: Option<Vec<FilterField>>,
    /// Sort field; `Some(None)` restores the default.
    pub sort_field: Option<Option<String>>,
    /// Sort direction.
    pub sort_direction: Option<SortDirection>,
    /// Scheduling switch.
    pub is_scheduled: Option<bool>,
    /// Run frequency; `Some(None)` clears it.
    pub frequency: Option<Option<Frequency>>,
    /// Schedule day; `Some(None)` clears it.
    pub schedule_day: Option<Option<String>>,
    /// Schedule time; `Some(None)` clears it.
    pub schedule_time: Option<Option<NaiveTime>>,
    /// Public visibility.
    pub is_public: Option<bool>,
}

impl UpdateReport {
    /// Apply the changes to a copy of `current`.
    pub fn apply(self, current: &ReportDefinition, now: DateTime<Utc>) -> ReportDefinition {
        let mut next = current.clone();
        if let Some(name) = self.name {
            next.name = name;
        }
        if let Some(description) = self.description {
            next.description = description;
        }
        if let Some(kind) = self.kind {
            next.kind = kind;
        }
        if let Some(format) = self.format {
            next.format = format;
        }
        if let Some(columns) = self.columns {
            next.columns = Json(columns);
        }
        if let Some(filters) = self.filters {
            next.filters = Json(filters);
        }
        if let Some(sort_field) = self.sort_field {
            next.sort_field = sort_field;
        }
        if let Some(direction) = self.sort_direction {
            next.sort_direction = direction;
        }
        if let Some(is_scheduled) = self.is_scheduled {
            next.is_scheduled = is_scheduled;
        }
        if let Some(frequency) = self.frequency {
            next.frequency = frequency;
        }
        if let Some(day) = self.schedule_day {
            next.schedule_day = day;
        }
        if let Some(time) = self.schedule_time {
            next.schedule_time = time;
        }
        if let Some(is_public) = self.is_public {
            next.is_public = is_public;
        }
        next.updated_at = now;
        next
    }
}
