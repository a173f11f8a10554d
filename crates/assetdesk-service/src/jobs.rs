//! Enqueueing typed jobs onto the durable queue.

use std::sync::Arc;

use assetdesk_core::config::WorkerConfig;
use assetdesk_core::result::AppResult;
use assetdesk_core::types::UserId;
use assetdesk_database::JobStore;
use assetdesk_entity::job::{CreateJob, Job, JobPayload, JobPriority};

/// Writes typed payloads to the job queue configured for report work.
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    store: Arc<dyn JobStore>,
    queue: String,
    max_attempts: i32,
}

impl JobSubmitter {
    /// Create a submitter for the worker's queue.
    pub fn new(store: Arc<dyn JobStore>, config: &WorkerConfig) -> Self {
        Self {
            store,
            queue: config.queue.clone(),
            max_attempts: config.max_attempts,
        }
    }

    /// Queue the jobs are written to.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Enqueue `payload` to run as soon as a worker is free.
    pub async fn submit(
        &self,
        payload: &JobPayload,
        priority: JobPriority,
        created_by: Option<UserId>,
    ) -> AppResult<Job> {
        let encoded = payload.encode()?;

        let job = self
            .store
            .create(&CreateJob {
                job_type: payload.job_type().to_string(),
                queue: self.queue.clone(),
                priority,
                payload: encoded,
                max_attempts: self.max_attempts,
                scheduled_at: None,
                created_by,
            })
            .await?;

        tracing::debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            queue = %job.queue,
            "Enqueued job"
        );
        Ok(job)
    }
}
