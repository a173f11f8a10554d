//! Worker runner: main loop that polls the queue and executes jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::time;

use assetdesk_core::config::WorkerConfig;
use assetdesk_core::result::AppResult;
use assetdesk_entity::job::Job;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::JobQueue;

/// First retry delay; doubles per attempt.
const RETRY_BASE_SECONDS: i64 = 30;
/// Longest delay between attempts.
const RETRY_MAX_SECONDS: i64 = 3600;
/// How long shutdown waits for in-flight jobs.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);
/// How often the queue is swept for jobs left behind by dead workers.
const STALE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Main worker runner that polls the queue and executes jobs
#[derive(Debug)]
pub struct WorkerRunner {
    queue: Arc<JobQueue>,
    executor: Arc<JobExecutor>,
    config: WorkerConfig,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
        }
    }

    /// Run until the cancel signal turns `true`, then wait for in-flight jobs.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency.max(1);
        tracing::info!(
            worker_id = %self.queue.worker_id(),
            queue = %self.queue.name(),
            concurrency,
            poll_interval_seconds = self.config.poll_interval_seconds,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds.max(1));
        let mut last_sweep: Option<time::Instant> = None;

        loop {
            if *cancel.borrow() {
                break;
            }
            if last_sweep.is_none_or(|at| at.elapsed() >= STALE_SWEEP_INTERVAL) {
                if let Err(err) = self.release_stale(Utc::now()).await {
                    tracing::error!(error = %err, "Failed to release stale jobs");
                }
                last_sweep = Some(time::Instant::now());
            }
            let permit = tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            if self.claim_and_spawn(permit).await {
                continue;
            }
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = time::sleep(poll_interval) => {}
            }
        }

        tracing::info!(worker_id = %self.queue.worker_id(), "Worker waiting for in-flight jobs");
        let permits = u32::try_from(concurrency).unwrap_or(u32::MAX);
        if time::timeout(SHUTDOWN_GRACE, semaphore.acquire_many(permits))
            .await
            .is_err()
        {
            tracing::warn!(
                worker_id = %self.queue.worker_id(),
                "Shutdown grace period elapsed with jobs still running"
            );
        }
        tracing::info!(worker_id = %self.queue.worker_id(), "Worker shut down");
    }

    /// Claim one job and spawn it on `permit`. Returns whether a job was claimed.
    async fn claim_and_spawn(&self, permit: OwnedSemaphorePermit) -> bool {
        match self.queue.dequeue(Utc::now()).await {
            Ok(Some(job)) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);
                let timeout = self.job_timeout();
                tokio::spawn(async move {
                    let _permit = permit;
                    process(&queue, &executor, timeout, job).await;
                });
                true
            }
            Ok(None) => {
                tracing::trace!("No jobs available");
                false
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to dequeue job");
                false
            }
        }
    }

    /// Claim and run a single job inline. Returns the processed job, if any.
    pub async fn run_once(&self) -> AppResult<Option<Job>> {
        let Some(job) = self.queue.dequeue(Utc::now()).await? else {
            return Ok(None);
        };
        let id = job.id;
        process(&self.queue, &self.executor, self.job_timeout(), job).await;
        self.queue.find(id).await
    }

    /// Requeue jobs that have been running longer than any live worker
    /// would allow, measured from `now`.
    pub async fn release_stale(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let window = chrono::Duration::from_std(self.config.stale_after())
            .unwrap_or(chrono::Duration::MAX);
        let cutoff = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.queue.release_stale(cutoff).await
    }

    fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.config.job_timeout_seconds.max(1))
    }
}

/// Execute `job` under `timeout` and record the outcome on the queue.
async fn process(queue: &JobQueue, executor: &JobExecutor, timeout: Duration, job: Job) {
    let started = std::time::Instant::now();
    let (outcome, timed_out) = match time::timeout(timeout, executor.execute(&job)).await {
        Ok(outcome) => (outcome, false),
        Err(_) => (
            Err(JobExecutionError::Transient(format!(
                "Job timed out after {}s",
                timeout.as_secs()
            ))),
            true,
        ),
    };

    let recorded = match outcome {
        Ok(result) => {
            tracing::info!(
                job_id = %job.id,
                job_type = %job.job_type,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job completed"
            );
            queue.complete(job.id, result.as_ref()).await
        }
        Err(err) if err.is_retryable() && job.attempts < job.max_attempts => {
            let delay = retry_delay(job.attempts);
            tracing::warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.attempts,
                max_attempts = job.max_attempts,
                retry_in_seconds = delay.num_seconds(),
                error = %err,
                "Job failed, will retry"
            );
            if timed_out {
                executor.abandon(&job, &err.message()).await;
            }
            queue.retry(job.id, &err.message(), Utc::now() + delay).await
        }
        Err(err) => {
            tracing::error!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.attempts,
                error = %err,
                "Job failed permanently"
            );
            executor.abandon(&job, &err.message()).await;
            queue.fail(job.id, &err.message()).await
        }
    };

    if let Err(err) = recorded {
        tracing::error!(job_id = %job.id, error = %err, "Failed to record job outcome");
    }
}

/// Delay before the next attempt after `attempts` tries.
pub fn retry_delay(attempts: i32) -> chrono::Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 16) as u32;
    let seconds = RETRY_BASE_SECONDS
        .saturating_mul(2_i64.saturating_pow(exponent))
        .min(RETRY_MAX_SECONDS);
    chrono::Duration::seconds(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::JobHandler;
    use assetdesk_core::AppError;
    use assetdesk_database::memory::MemoryJobStore;
    use assetdesk_entity::job::{JobPayload, JobPriority, JobStatus, SCHEDULED_REPORT_CHECK};
    use assetdesk_service::JobSubmitter;
    use async_trait::async_trait;
    use serde_json::Value;

    #[derive(Debug)]
    struct Failing(fn() -> JobExecutionError);

    #[async_trait]
    impl JobHandler for Failing {
        fn job_type(&self) -> &'static str {
            SCHEDULED_REPORT_CHECK
        }

        async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
            Err((self.0)())
        }
    }

    #[derive(Debug, Default)]
    struct Slow {
        abandoned: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobHandler for Slow {
        fn job_type(&self) -> &'static str {
            SCHEDULED_REPORT_CHECK
        }

        async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
            time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn on_abandoned(&self, _job: &Job, reason: &str) {
            self.abandoned.lock().unwrap().push(reason.to_string());
        }
    }

    async fn runner(handler: Arc<dyn JobHandler>, config: WorkerConfig) -> WorkerRunner {
        let store = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(JobQueue::new(JobSubmitter::new(store, &config), "w1"));
        queue
            .enqueue(&JobPayload::ScheduledReportCheck, JobPriority::Normal, None)
            .await
            .unwrap();
        let mut executor = JobExecutor::new();
        executor.register(handler);
        WorkerRunner::new(queue, Arc::new(executor), config)
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(1).num_seconds(), 30);
        assert_eq!(retry_delay(2).num_seconds(), 60);
        assert_eq!(retry_delay(3).num_seconds(), 120);
        assert_eq!(retry_delay(20).num_seconds(), RETRY_MAX_SECONDS);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let runner = runner(
            Arc::new(Failing(|| AppError::storage("disk offline").into())),
            WorkerConfig::default(),
        )
        .await;

        let job = runner.run_once().await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 1);
        assert!(job.scheduled_at.unwrap() > Utc::now());
        assert!(job.error_message.unwrap().contains("disk offline"));
    }

    #[tokio::test]
    async fn test_permanent_failure_fails_immediately() {
        let runner = runner(
            Arc::new(Failing(|| AppError::not_found("Report gone").into())),
            WorkerConfig::default(),
        )
        .await;

        let job = runner.run_once().await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 1);
    }

    #[tokio::test]
    async fn test_last_attempt_fails() {
        let config = WorkerConfig {
            max_attempts: 1,
            ..WorkerConfig::default()
        };
        let runner = runner(
            Arc::new(Failing(|| JobExecutionError::Transient("flaky".to_string()))),
            config,
        )
        .await;

        let job = runner.run_once().await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("flaky"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_transient() {
        let config = WorkerConfig {
            job_timeout_seconds: 5,
            ..WorkerConfig::default()
        };
        let slow = Arc::new(Slow::default());
        let runner = runner(slow.clone(), config).await;

        let job = runner.run_once().await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.error_message.unwrap().contains("timed out"));
        let abandoned = slow.abandoned.lock().unwrap().clone();
        assert_eq!(abandoned.len(), 1);
        assert!(abandoned[0].contains("timed out"));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let runner = runner(
            Arc::new(Failing(|| JobExecutionError::Permanent("no".to_string()))),
            WorkerConfig::default(),
        )
        .await;
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });
        tx.send(true).unwrap();
        time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_release_stale_requeues_lost_job() {
        let config = WorkerConfig {
            job_timeout_seconds: 60,
            ..WorkerConfig::default()
        };
        let runner = runner(
            Arc::new(Failing(|| JobExecutionError::Permanent("no".to_string()))),
            config,
        )
        .await;
        let claimed_at = Utc::now() - chrono::Duration::minutes(5);
        let lost = runner.queue.dequeue(claimed_at).await.unwrap().unwrap();

        assert_eq!(runner.release_stale(claimed_at + chrono::Duration::seconds(90)).await.unwrap(), 0);
        assert_eq!(runner.release_stale(Utc::now()).await.unwrap(), 1);

        let job = runner.queue.find(lost.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 1);
    }
}
