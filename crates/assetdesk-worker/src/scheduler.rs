//! Cron scheduler that enqueues the periodic report jobs.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use assetdesk_core::AppError;
use assetdesk_core::config::ReportsConfig;
use assetdesk_entity::job::{JobPayload, JobPriority};

use crate::queue::JobQueue;

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    scheduler: JobScheduler,
    queue: Arc<JobQueue>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("queue", &self.queue.name())
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(queue: Arc<JobQueue>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, queue })
    }

    /// Register the scheduled report check and the daily cleanup sweep
    pub async fn register_default_tasks(&self, reports: &ReportsConfig) -> Result<(), AppError> {
        self.register(
            &reports.scheduler_cron,
            JobPayload::ScheduledReportCheck,
            JobPriority::Normal,
        )
        .await?;
        self.register(
            &reports.cleanup_cron()?,
            JobPayload::ReportCleanup {
                days: None,
                dry_run: false,
            },
            JobPriority::Low,
        )
        .await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Enqueue `payload` every time `cron` fires
    pub async fn register(
        &self,
        cron: &str,
        payload: JobPayload,
        priority: JobPriority,
    ) -> Result<(), AppError> {
        let job_type = payload.job_type();
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            let payload = payload.clone();
            Box::pin(async move {
                tracing::debug!(job_type = %payload.job_type(), "Scheduling periodic job");
                if let Err(e) = queue.enqueue(&payload, priority, None).await {
                    tracing::error!(
                        job_type = %payload.job_type(),
                        error = %e,
                        "Failed to enqueue periodic job"
                    );
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid cron '{cron}' for {job_type}: {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {job_type} schedule: {e}")))?;

        tracing::info!(job_type = %job_type, cron = %cron, "Registered periodic job");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetdesk_core::config::WorkerConfig;
    use assetdesk_core::error::ErrorKind;
    use assetdesk_database::memory::MemoryJobStore;
    use assetdesk_service::JobSubmitter;

    fn queue() -> Arc<JobQueue> {
        let store = Arc::new(MemoryJobStore::new());
        Arc::new(JobQueue::new(
            JobSubmitter::new(store, &WorkerConfig::default()),
            "cron",
        ))
    }

    #[tokio::test]
    async fn test_registers_default_tasks() {
        let scheduler = CronScheduler::new(queue()).await.unwrap();
        scheduler
            .register_default_tasks(&ReportsConfig::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_cron_is_configuration_error() {
        let scheduler = CronScheduler::new(queue()).await.unwrap();
        let err = scheduler
            .register("every tuesday", JobPayload::ScheduledReportCheck, JobPriority::Normal)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
