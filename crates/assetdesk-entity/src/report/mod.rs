//! Report definition domain entities.

pub mod format;
pub mod kind;
pub mod model;
pub mod row;
pub mod schedule;
pub mod status;

pub use format::ExportFormat;
pub use kind::{FieldDef, FieldType, ReportKind};
pub use model::{CreateReport, ReportDefinition, UpdateReport};
pub use row::{ResourceQuery, Row};
pub use schedule::{Frequency, Schedule, ScheduleDay};
pub use status::ReportStatus;
