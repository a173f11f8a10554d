//! In-memory job store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use assetdesk_core::result::AppResult;
use assetdesk_core::types::JobId;
use assetdesk_entity::job::{CreateJob, Job, JobStatus};

use crate::store::{JobStats, JobStore};

/// Jobs held in a map behind a single mutex, so claims are atomic.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every job, oldest first.
    pub async fn all(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.lock().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs
    }

    fn update<F>(jobs: &mut HashMap<JobId, Job>, id: JobId, f: F)
    where
        F: FnOnce(&mut Job),
    {
        if let Some(job) = jobs.get_mut(&id) {
            f(job);
            job.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, data: &CreateJob) -> AppResult<Job> {
        let now = Utc::now();
        let job = Job {
            id: JobId::new(),
            job_type: data.job_type.clone(),
            queue: data.queue.clone(),
            priority: data.priority,
            payload: data.payload.clone(),
            result: None,
            error_message: None,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: data.max_attempts,
            scheduled_at: data.scheduled_at,
            started_at: None,
            completed_at: None,
            created_by: data.created_by,
            worker_id: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        Ok(self.jobs.lock().await.get(&id).cloned())
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Job>> {
        let mut jobs = self.jobs.lock().await;
        let next = jobs
            .values()
            .filter(|j| j.queue == queue && j.status == JobStatus::Pending)
            .filter(|j| j.scheduled_at.is_none_or(|at| at <= now))
            .min_by(|a, b| {
                b.priority
                    .numeric_priority()
                    .cmp(&a.priority.numeric_priority())
                    .then(a.created_at.cmp(&b.created_at))
            })
            .map(|j| j.id);

        Ok(next.and_then(|id| {
            let job = jobs.get_mut(&id)?;
            job.status = JobStatus::Running;
            job.started_at = Some(now);
            job.worker_id = Some(worker_id.to_string());
            job.attempts += 1;
            job.updated_at = now;
            Some(job.clone())
        }))
    }

    async fn complete(&self, id: JobId, result: Option<&serde_json::Value>) -> AppResult<()> {
        let mut jobs = self.jobs.lock().await;
        Self::update(&mut jobs, id, |job| {
            job.status = JobStatus::Completed;
            job.result = result.cloned();
            job.error_message = None;
            job.completed_at = Some(Utc::now());
        });
        Ok(())
    }

    async fn fail(&self, id: JobId, error_message: &str) -> AppResult<()> {
        let mut jobs = self.jobs.lock().await;
        Self::update(&mut jobs, id, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(error_message.to_string());
            job.completed_at = Some(Utc::now());
        });
        Ok(())
    }

    async fn retry(&self, id: JobId, error_message: &str, run_at: DateTime<Utc>) -> AppResult<()> {
        let mut jobs = self.jobs.lock().await;
        Self::update(&mut jobs, id, |job| {
            job.status = JobStatus::Pending;
            job.error_message = Some(error_message.to_string());
            job.scheduled_at = Some(run_at);
            job.started_at = None;
            job.worker_id = None;
        });
        Ok(())
    }

    async fn release_stale(&self, queue: &str, started_before: DateTime<Utc>) -> AppResult<u64> {
        let mut jobs = self.jobs.lock().await;
        let now = Utc::now();
        let mut released = 0;
        for job in jobs.values_mut().filter(|j| {
            j.queue == queue
                && j.status == JobStatus::Running
                && j.started_at.is_some_and(|at| at < started_before)
        }) {
            if job.attempts >= job.max_attempts {
                job.status = JobStatus::Failed;
                job.completed_at = Some(now);
            } else {
                job.status = JobStatus::Pending;
            }
            job.error_message = Some("Worker stopped before the job finished".to_string());
            job.started_at = None;
            job.worker_id = None;
            job.updated_at = now;
            released += 1;
        }
        Ok(released)
    }

    async fn stats(&self, queue: Option<&str>) -> AppResult<JobStats> {
        let jobs = self.jobs.lock().await;
        let mut stats = JobStats::default();
        for job in jobs.values().filter(|j| queue.is_none_or(|q| j.queue == q)) {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
        }
        Ok(stats)
    }

    async fn list_recent(&self, limit: i64) -> AppResult<Vec<Job>> {
        let mut jobs = self.all().await;
        jobs.reverse();
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetdesk_entity::job::JobPriority;

    fn create(queue: &str, priority: JobPriority) -> CreateJob {
        CreateJob {
            job_type: "report_generation".to_string(),
            queue: queue.to_string(),
            priority,
            payload: serde_json::json!({}),
            max_attempts: 3,
            scheduled_at: None,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_claim_prefers_priority_and_is_exclusive() {
        let store = MemoryJobStore::new();
        store.create(&create("reports", JobPriority::Low)).await.unwrap();
        let high = store.create(&create("reports", JobPriority::High)).await.unwrap();

        let claimed = store
            .claim_next("reports", "w1", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, high.id);
        assert_eq!(claimed.attempts, 1);
        assert_eq!(claimed.status, JobStatus::Running);

        let second = store
            .claim_next("reports", "w2", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_ne!(second.id, high.id);
        assert!(store.claim_next("reports", "w3", Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_delays_next_claim() {
        let store = MemoryJobStore::new();
        let job = store.create(&create("reports", JobPriority::Normal)).await.unwrap();
        let now = Utc::now();
        store.claim_next("reports", "w1", now).await.unwrap();
        store
            .retry(job.id, "disk full", now + chrono::Duration::seconds(30))
            .await
            .unwrap();
        assert!(store.claim_next("reports", "w1", now).await.unwrap().is_none());
        let again = store
            .claim_next("reports", "w1", now + chrono::Duration::seconds(31))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.attempts, 2);
        assert_eq!(store.stats(Some("reports")).await.unwrap().running, 1);
    }

    #[tokio::test]
    async fn test_release_stale_requeues_or_fails() {
        let store = MemoryJobStore::new();
        let now = Utc::now();
        let hour_ago = now - chrono::Duration::hours(1);
        let mut last_try = create("reports", JobPriority::Normal);
        last_try.max_attempts = 1;
        let lost = store.create(&create("reports", JobPriority::High)).await.unwrap();
        let exhausted = store.create(&last_try).await.unwrap();
        store.claim_next("reports", "w1", hour_ago).await.unwrap();
        store.claim_next("reports", "w1", hour_ago).await.unwrap();
        let fresh = store.create(&create("reports", JobPriority::Low)).await.unwrap();
        store.claim_next("reports", "w2", now).await.unwrap();

        let released = store
            .release_stale("reports", now - chrono::Duration::minutes(10))
            .await
            .unwrap();

        assert_eq!(released, 2);
        let lost = store.find_by_id(lost.id).await.unwrap().unwrap();
        assert_eq!(lost.status, JobStatus::Pending);
        assert!(lost.worker_id.is_none());
        let exhausted = store.find_by_id(exhausted.id).await.unwrap().unwrap();
        assert_eq!(exhausted.status, JobStatus::Failed);
        let fresh = store.find_by_id(fresh.id).await.unwrap().unwrap();
        assert_eq!(fresh.status, JobStatus::Running);
    }
}
