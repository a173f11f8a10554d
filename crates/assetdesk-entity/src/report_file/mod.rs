//! Generated report file entities.

pub mod model;

pub use model::{CreateReportFile, ReportFile};
