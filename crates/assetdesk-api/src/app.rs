//! Application builder: wires the pipeline, worker and router into a
//! running server.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use assetdesk_auth::JwtDecoder;
use assetdesk_cache::CacheManager;
use assetdesk_core::config::AppConfig;
use assetdesk_core::error::AppError;
use assetdesk_database::DatabasePool;
use assetdesk_service::{Pipeline, Stores};
use assetdesk_storage::StorageManager;
use assetdesk_worker::{CronScheduler, JobQueue, WorkerRunner, report_executor};

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// State for `pipeline` under `config`.
pub fn app_state(config: &AppConfig, pipeline: &Pipeline) -> AppState {
    AppState::new(
        Arc::new(config.clone()),
        Arc::new(JwtDecoder::new(&config.auth)),
        Arc::clone(&pipeline.reports),
    )
}

/// Runs the AssetDesk server against PostgreSQL until Ctrl+C.
pub async fn run_server(config: AppConfig, db: DatabasePool) -> Result<(), AppError> {
    tracing::info!("Starting AssetDesk report server...");

    let storage = Arc::new(StorageManager::from_config(&config.storage).await?);
    let cache = Arc::new(CacheManager::new(&config.cache));
    let pipeline = Pipeline::build(&config, Stores::postgres(&db), storage, cache);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let background = if config.worker.enabled {
        Some(start_background(&config, &pipeline, shutdown_rx).await?)
    } else {
        tracing::info!("Worker disabled, jobs will wait for an external worker");
        None
    };

    let app = build_app(app_state(&config, &pipeline));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "AssetDesk server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("HTTP server stopped, shutting down background tasks");
    if shutdown_tx.send(true).is_err() {
        tracing::debug!("No background tasks listening for shutdown");
    }
    if let Some(background) = background {
        background
            .stop(Duration::from_secs(config.server.shutdown_grace_seconds))
            .await;
    }
    db.close().await;

    Ok(())
}

/// Worker loop and cron scheduler running next to the HTTP server.
#[derive(Debug)]
pub struct Background {
    worker: JoinHandle<()>,
    scheduler: CronScheduler,
}

impl Background {
    /// Stop the scheduler and wait up to `grace` for the worker to drain.
    pub async fn stop(self, grace: Duration) {
        if let Err(err) = self.scheduler.shutdown().await {
            tracing::warn!(error = %err, "Failed to stop cron scheduler");
        }
        match tokio::time::timeout(grace, self.worker).await {
            Ok(Ok(())) => tracing::info!("Worker stopped"),
            Ok(Err(err)) => tracing::error!(error = %err, "Worker task panicked"),
            Err(_) => tracing::warn!("Worker did not stop within the grace period"),
        }
    }
}

/// Spawn the worker and start the cron triggers.
pub async fn start_background(
    config: &AppConfig,
    pipeline: &Pipeline,
    cancel: watch::Receiver<bool>,
) -> Result<Background, AppError> {
    let worker_id = format!("worker-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let queue = Arc::new(JobQueue::new(pipeline.jobs.clone(), worker_id));

    let executor = Arc::new(report_executor(
        pipeline.generator.clone(),
        pipeline.dispatcher.clone(),
        pipeline.cleanup.clone(),
        config.reports.clone(),
    ));
    let runner = WorkerRunner::new(Arc::clone(&queue), executor, config.worker.clone());
    let worker = tokio::spawn(async move { runner.run(cancel).await });

    let scheduler = CronScheduler::new(queue).await?;
    scheduler.register_default_tasks(&config.reports).await?;
    scheduler.start().await?;

    Ok(Background { worker, scheduler })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
