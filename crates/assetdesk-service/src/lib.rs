//! # assetdesk-service
//!
//! Report pipeline services for AssetDesk. Each service orchestrates the
//! stores, cache and storage disks to implement one use case: resolving a
//! definition to rows, exporting them, recording the generated file,
//! dispatching scheduled runs and sweeping expired files.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod jobs;
pub mod pipeline;
pub mod report;

pub use context::{Preferences, RequestContext, Theme};
pub use jobs::JobSubmitter;
pub use pipeline::{Pipeline, Stores};
pub use report::{
    CleanupOptions, CleanupService, CleanupSummary, DispatchService, DispatchSummary,
    ExportOutcome, ReportDataResolver, ReportExporter, ReportGenerator, ReportService,
};
