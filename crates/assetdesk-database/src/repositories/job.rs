//! Job repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use assetdesk_core::error::{AppError, ErrorKind};
use assetdesk_core::result::AppResult;
use assetdesk_core::types::JobId;
use assetdesk_entity::job::{CreateJob, Job, JobStatus};

use crate::store::{JobStats, JobStore};

/// Repository for background job queue operations.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn create(&self, data: &CreateJob) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (id, job_type, queue, priority, payload, max_attempts, scheduled_at, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(JobId::new())
        .bind(&data.job_type)
        .bind(&data.queue)
        .bind(data.priority)
        .bind(&data.payload)
        .bind(data.max_attempts)
        .bind(data.scheduled_at)
        .bind(data.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create job", e))
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'running', started_at = $3, worker_id = $2, \
             attempts = attempts + 1, updated_at = $3 \
             WHERE id = ( \
                SELECT id FROM jobs \
                WHERE queue = $1 AND status = 'pending' \
                AND (scheduled_at IS NULL OR scheduled_at <= $3) \
                ORDER BY priority DESC, created_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT 1 \
             ) RETURNING *",
        )
        .bind(queue)
        .bind(worker_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to dequeue job", e))
    }

    async fn complete(&self, id: JobId, result: Option<&serde_json::Value>) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', result = $2, error_message = NULL, \
             completed_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job", e))?;
        Ok(())
    }

    async fn fail(&self, id: JobId, error_message: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = $2, completed_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job as failed", e))?;
        Ok(())
    }

    async fn retry(&self, id: JobId, error_message: &str, run_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'pending', error_message = $2, scheduled_at = $3, \
             started_at = NULL, worker_id = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .bind(run_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to retry job", e))?;
        Ok(())
    }

    async fn release_stale(&self, queue: &str, started_before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET \
             status = CASE WHEN attempts >= max_attempts \
                 THEN 'failed'::job_status ELSE 'pending'::job_status END, \
             completed_at = CASE WHEN attempts >= max_attempts THEN NOW() ELSE NULL END, \
             error_message = 'Worker stopped before the job finished', \
             started_at = NULL, worker_id = NULL, updated_at = NOW() \
             WHERE queue = $1 AND status = 'running' AND started_at < $2",
        )
        .bind(queue)
        .bind(started_before)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to release stale jobs", e))?;
        Ok(result.rows_affected())
    }

    async fn stats(&self, queue: Option<&str>) -> AppResult<JobStats> {
        let rows: Vec<(JobStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM jobs \
             WHERE ($1::text IS NULL OR queue = $1) GROUP BY status",
        )
        .bind(queue)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))?;

        let mut stats = JobStats::default();
        for (status, count) in rows {
            match status {
                JobStatus::Pending => stats.pending = count,
                JobStatus::Running => stats.running = count,
                JobStatus::Completed => stats.completed = count,
                JobStatus::Failed => stats.failed = count,
                JobStatus::Cancelled => stats.cancelled = count,
            }
        }
        Ok(stats)
    }

    async fn list_recent(&self, limit: i64) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))
    }
}
