//! Job queue over the durable job store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use assetdesk_core::AppError;
use assetdesk_core::result::AppResult;
use assetdesk_core::types::{JobId, UserId};
use assetdesk_database::JobStore;
use assetdesk_entity::job::{Job, JobPayload, JobPriority};
use assetdesk_service::JobSubmitter;

/// Job queue for enqueuing and claiming work on one named queue
#[derive(Debug, Clone)]
pub struct JobQueue {
    submitter: JobSubmitter,
    worker_id: String,
}

impl JobQueue {
    /// Create a queue handle claiming jobs as `worker_id`
    pub fn new(submitter: JobSubmitter, worker_id: impl Into<String>) -> Self {
        Self {
            submitter,
            worker_id: worker_id.into(),
        }
    }

    fn store(&self) -> &Arc<dyn JobStore> {
        self.submitter.store()
    }

    /// Queue name
    pub fn name(&self) -> &str {
        self.submitter.queue()
    }

    /// Worker identifier used when claiming
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Enqueue a typed job
    pub async fn enqueue(
        &self,
        payload: &JobPayload,
        priority: JobPriority,
        created_by: Option<UserId>,
    ) -> AppResult<Job> {
        self.submitter.submit(payload, priority, created_by).await
    }

    /// Enqueue a job given as a type name and raw JSON payload.
    ///
    /// The payload must decode as a known job type.
    pub async fn enqueue_raw(
        &self,
        job_type: &str,
        payload: &Value,
        created_by: Option<UserId>,
    ) -> AppResult<Job> {
        let payload = JobPayload::decode(job_type, payload).map_err(|e| {
            AppError::validation(format!("Invalid payload for job type '{job_type}': {e}"))
        })?;
        self.enqueue(&payload, JobPriority::Normal, created_by).await
    }

    /// Claim the next runnable job, if any
    pub async fn dequeue(&self, now: DateTime<Utc>) -> AppResult<Option<Job>> {
        let job = self
            .store()
            .claim_next(self.name(), &self.worker_id, now)
            .await?;
        if let Some(job) = &job {
            tracing::debug!(
                job_id = %job.id,
                job_type = %job.job_type,
                queue = %job.queue,
                "Dequeued job"
            );
        }
        Ok(job)
    }

    /// Mark a job as completed successfully
    pub async fn complete(&self, job_id: JobId, result: Option<&Value>) -> AppResult<()> {
        self.store().complete(job_id, result).await?;
        tracing::debug!(job_id = %job_id, "Job completed");
        Ok(())
    }

    /// Mark a job as failed for good
    pub async fn fail(&self, job_id: JobId, error: &str) -> AppResult<()> {
        self.store().fail(job_id, error).await?;
        tracing::debug!(job_id = %job_id, error = %error, "Job failed");
        Ok(())
    }

    /// Return a job to pending, runnable from `run_at`
    pub async fn retry(&self, job_id: JobId, error: &str, run_at: DateTime<Utc>) -> AppResult<()> {
        self.store().retry(job_id, error, run_at).await?;
        tracing::debug!(job_id = %job_id, run_at = %run_at, "Job scheduled for retry");
        Ok(())
    }

    /// Return jobs stuck `running` since before `started_before` to the queue
    pub async fn release_stale(&self, started_before: DateTime<Utc>) -> AppResult<u64> {
        let released = self.store().release_stale(self.name(), started_before).await?;
        if released > 0 {
            tracing::warn!(
                queue = %self.name(),
                released,
                started_before = %started_before,
                "Released jobs abandoned by a stopped worker"
            );
        }
        Ok(released)
    }

    /// Find a job by id
    pub async fn find(&self, job_id: JobId) -> AppResult<Option<Job>> {
        self.store().find_by_id(job_id).await
    }

    /// Most recently created jobs
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<Job>> {
        self.store().list_recent(limit).await
    }

    /// Get queue statistics
    pub async fn stats(&self) -> AppResult<QueueStats> {
        let stats = self.store().stats(Some(self.name())).await?;
        Ok(QueueStats {
            queue: self.name().to_string(),
            worker_id: self.worker_id.clone(),
            pending: stats.pending,
            running: stats.running,
            completed: stats.completed,
            failed: stats.failed,
            cancelled: stats.cancelled,
        })
    }
}

/// Queue statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Queue name
    pub queue: String,
    /// Current worker identifier
    pub worker_id: String,
    /// Number of pending jobs
    pub pending: i64,
    /// Number of running jobs
    pub running: i64,
    /// Number of completed jobs
    pub completed: i64,
    /// Number of failed jobs
    pub failed: i64,
    /// Number of cancelled jobs
    pub cancelled: i64,
}
