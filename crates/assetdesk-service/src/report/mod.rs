//! The report pipeline: definition, rows, export, stored file, schedule
//! and cleanup.

pub mod cleanup;
pub mod dispatch;
pub mod export;
pub mod generator;
pub mod resolver;
pub mod schedule;
pub mod service;

#[cfg(test)]
mod fixture;

pub use cleanup::{CleanupOptions, CleanupService, CleanupSummary};
pub use dispatch::{DispatchService, DispatchSummary};
pub use export::{ExportArtifact, ExportColumn, ReportExporter};
pub use generator::ReportGenerator;
pub use resolver::ReportDataResolver;
pub use schedule::{is_due, next_run};
pub use service::{Download, ExportOutcome, PreviewColumn, PreviewData, ReportPreview, ReportService};
