//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the server process runs the worker and cron scheduler.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Queue the worker consumes and report jobs are pushed to.
    #[serde(default = "default_queue")]
    pub queue: String,
    /// Maximum concurrent jobs.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Poll interval in seconds when the queue is empty.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Maximum wall time for a single job.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_seconds: u64,
    /// Attempts before a job is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue: default_queue(),
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            job_timeout_seconds: default_job_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl WorkerConfig {
    /// How long a job or report run may stay in flight before it is
    /// presumed abandoned by a dead worker.
    pub fn stale_after(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.job_timeout_seconds.max(1).saturating_mul(2))
    }
}

fn default_true() -> bool {
    true
}

fn default_queue() -> String {
    "reports".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    5
}

fn default_job_timeout() -> u64 {
    300
}

fn default_max_attempts() -> i32 {
    3
}
