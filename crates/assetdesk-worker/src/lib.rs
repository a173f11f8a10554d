//! Background job processing and scheduled tasks for AssetDesk reports.
//!
//! This crate provides:
//! - A worker runner that polls the report queue and executes jobs
//! - A cron scheduler enqueueing the scheduled report check and the cleanup sweep
//! - A job executor that dispatches jobs to the correct handler
//! - Handlers for report generation, scheduled dispatch and cleanup

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

use std::sync::Arc;

use assetdesk_core::config::ReportsConfig;
use assetdesk_service::{CleanupService, DispatchService, ReportGenerator};

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::{JobQueue, QueueStats};
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;

/// An executor with every report job handler registered.
pub fn report_executor(
    generator: ReportGenerator,
    dispatcher: DispatchService,
    cleanup: CleanupService,
    reports: ReportsConfig,
) -> JobExecutor {
    let mut executor = JobExecutor::new();
    executor.register(Arc::new(jobs::ReportGenerationHandler::new(generator)));
    executor.register(Arc::new(jobs::ScheduledReportCheckHandler::new(dispatcher)));
    executor.register(Arc::new(jobs::ReportCleanupHandler::new(cleanup, reports)));
    executor
}
