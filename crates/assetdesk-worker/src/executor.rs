//! Job executor: dispatches claimed jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use assetdesk_core::AppError;
use assetdesk_entity::job::{Job, JobPayload};

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Job type this handler processes
    fn job_type(&self) -> &'static str;

    /// Execute the job, returning an optional result stored on the job row
    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError>;

    /// Called when the runner stops waiting on a job, either because it timed
    /// out or because it failed for the last time. The `execute` future may
    /// have been dropped mid-way, so state it owns must be released here.
    async fn on_abandoned(&self, _job: &Job, _reason: &str) {}
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure, do not retry
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure, may retry
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Error raised by a service; retried when its kind is transient
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Permanent(_) => false,
            Self::Transient(_) => true,
            Self::Internal(err) => err.is_transient(),
        }
    }

    /// Message recorded on the job row.
    pub fn message(&self) -> String {
        match self {
            Self::Permanent(msg) | Self::Transient(msg) => msg.clone(),
            Self::Internal(err) => err.to_string(),
        }
    }
}

/// Decode the typed payload of `job`. Undecodable payloads never succeed on retry.
pub fn decode_payload(job: &Job) -> Result<JobPayload, JobExecutionError> {
    JobPayload::decode(&job.job_type, &job.payload).map_err(|e| {
        JobExecutionError::Permanent(format!(
            "Invalid payload for job type '{}': {e}",
            job.job_type
        ))
    })
}

/// Dispatches jobs to the appropriate handler based on job_type
#[derive(Debug, Default)]
pub struct JobExecutor {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create an executor with no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler, replacing any previous one for its type
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!(job_type = %job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the correct handler
    pub async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job type '{}'",
                job.job_type
            ))
        })?;

        tracing::info!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Executing job"
        );

        handler.execute(job).await
    }

    /// Let the job's handler release state after a timeout or final failure
    pub async fn abandon(&self, job: &Job, reason: &str) {
        if let Some(handler) = self.handlers.get(&job.job_type) {
            handler.on_abandoned(job, reason).await;
        }
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Registered job types, sorted
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}
