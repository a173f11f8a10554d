//! Report job handlers.

pub mod cleanup;
pub mod generate;
pub mod scheduled;

pub use cleanup::ReportCleanupHandler;
pub use generate::ReportGenerationHandler;
pub use scheduled::ScheduledReportCheckHandler;
