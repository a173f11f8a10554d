//! Job queue management commands.

use std::process::ExitCode;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use assetdesk_core::config::AppConfig;
use assetdesk_core::error::AppError;
use assetdesk_entity::job::Job;
use assetdesk_worker::JobQueue;

use crate::output::{self, OutputFormat};

/// Arguments for worker commands
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Worker subcommand
    #[command(subcommand)]
    pub command: WorkerCommand,
}

/// Worker subcommands
#[derive(Debug, Subcommand)]
pub enum WorkerCommand {
    /// Show queue counts and the most recent jobs
    Status {
        /// How many recent jobs to list
        #[arg(long, default_value_t = 10)]
        recent: i64,
    },
    /// Enqueue a job of the given type
    Trigger {
        /// Job type, e.g. `scheduled_report_check`
        job_type: String,
        /// JSON payload
        #[arg(short, long, default_value = "{}")]
        payload: String,
    },
}

/// Job display row
#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    id: String,
    job_type: String,
    status: String,
    priority: String,
    attempts: String,
    created_at: String,
    error: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            job_type: job.job_type.clone(),
            status: job.status.to_string(),
            priority: job.priority.to_string(),
            attempts: format!("{}/{}", job.attempts, job.max_attempts),
            created_at: job.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            error: job.error_message.clone().unwrap_or_default(),
        }
    }
}

/// Execute worker commands
pub async fn execute(
    args: &WorkerArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<ExitCode, AppError> {
    let (db, pipeline) = super::connect(config).await?;
    let queue = JobQueue::new(pipeline.jobs.clone(), "cli");
    let result = run(&args.command, &queue, config, format).await;
    db.close().await;
    result.map(|()| ExitCode::SUCCESS)
}

async fn run(
    command: &WorkerCommand,
    queue: &JobQueue,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match command {
        WorkerCommand::Status { recent } => {
            let stats = queue.stats().await?;
            let jobs = queue.recent(*recent).await?;
            match format {
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "worker_enabled": config.worker.enabled,
                    "concurrency": config.worker.concurrency,
                    "stats": stats,
                    "recent": jobs,
                })),
                OutputFormat::Table => {
                    output::print_summary("Job queue", &stats, format);
                    output::print_kv("worker_enabled", &config.worker.enabled.to_string());
                    output::print_kv("concurrency", &config.worker.concurrency.to_string());
                    println!();
                    let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
                    output::print_list(&rows, format);
                }
            }
        }
        WorkerCommand::Trigger { job_type, payload } => {
            let payload: serde_json::Value = serde_json::from_str(payload)
                .map_err(|e| AppError::validation(format!("Invalid JSON payload: {e}")))?;
            let job = queue.enqueue_raw(job_type, &payload, None).await?;
            match format {
                OutputFormat::Json => output::print_json(&job),
                OutputFormat::Table => {
                    output::print_success(&format!("Job '{}' enqueued (id: {})", job_type, job.id))
                }
            }
        }
    }
    Ok(())
}
