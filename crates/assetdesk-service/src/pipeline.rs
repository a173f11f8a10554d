//! Wiring of the report pipeline from configuration and stores.

use std::sync::Arc;

use assetdesk_cache::CacheManager;
use assetdesk_core::config::AppConfig;
use assetdesk_database::memory::{
    MemoryJobStore, MemoryReportFileStore, MemoryReportStore, MemoryRowSource,
};
use assetdesk_database::repositories::{
    JobRepository, PgRowSource, ReportFileRepository, ReportRepository,
};
use assetdesk_database::{DatabasePool, JobStore, ReportFileStore, ReportStore, RowSource};
use assetdesk_storage::StorageManager;

use crate::jobs::JobSubmitter;
use crate::report::{
    CleanupService, DispatchService, ReportDataResolver, ReportExporter, ReportGenerator,
    ReportService,
};

/// The persistence the pipeline runs against.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Report definitions.
    pub reports: Arc<dyn ReportStore>,
    /// Generated file records.
    pub files: Arc<dyn ReportFileStore>,
    /// Background jobs.
    pub jobs: Arc<dyn JobStore>,
    /// Source rows per report kind.
    pub rows: Arc<dyn RowSource>,
}

impl Stores {
    /// PostgreSQL repositories sharing one pool.
    pub fn postgres(db: &DatabasePool) -> Self {
        let pool = db.pool().clone();
        Self {
            reports: Arc::new(ReportRepository::new(pool.clone())),
            files: Arc::new(ReportFileRepository::new(pool.clone())),
            jobs: Arc::new(JobRepository::new(pool.clone())),
            rows: Arc::new(PgRowSource::new(pool)),
        }
    }

    /// Empty in-memory stores.
    pub fn memory() -> Self {
        Self {
            reports: Arc::new(MemoryReportStore::new()),
            files: Arc::new(MemoryReportFileStore::new()),
            jobs: Arc::new(MemoryJobStore::new()),
            rows: Arc::new(MemoryRowSource::new()),
        }
    }
}

/// Every service of the report pipeline, built once per process.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Stores the services were built over.
    pub stores: Stores,
    /// Storage disks.
    pub storage: Arc<StorageManager>,
    /// Preview cache.
    pub cache: Arc<CacheManager>,
    /// Job submission for the configured queue.
    pub jobs: JobSubmitter,
    /// File generation.
    pub generator: ReportGenerator,
    /// Scheduled run dispatch.
    pub dispatcher: DispatchService,
    /// Expired file sweep.
    pub cleanup: CleanupService,
    /// User-facing report operations.
    pub reports: Arc<ReportService>,
}

impl Pipeline {
    /// Build the services for `config`.
    pub fn build(
        config: &AppConfig,
        stores: Stores,
        storage: Arc<StorageManager>,
        cache: Arc<CacheManager>,
    ) -> Self {
        let resolver = ReportDataResolver::new(Arc::clone(&stores.rows));
        let jobs = JobSubmitter::new(Arc::clone(&stores.jobs), &config.worker);
        let generator = ReportGenerator::new(
            Arc::clone(&stores.reports),
            Arc::clone(&stores.files),
            resolver.clone(),
            ReportExporter::new(config.export.clone()),
            Arc::clone(&storage),
            config.reports.clone(),
        );
        let dispatcher = DispatchService::new(
            Arc::clone(&stores.reports),
            jobs.clone(),
            config.worker.stale_after(),
        );
        let cleanup = CleanupService::new(
            Arc::clone(&stores.files),
            Arc::clone(&storage),
            config.reports.directory.clone(),
        );
        let reports = Arc::new(ReportService::new(
            Arc::clone(&stores.reports),
            Arc::clone(&stores.files),
            resolver,
            generator.clone(),
            jobs.clone(),
            Arc::clone(&storage),
            Arc::clone(&cache),
            config.reports.clone(),
        ));

        Self {
            stores,
            storage,
            cache,
            jobs,
            generator,
            dispatcher,
            cleanup,
            reports,
        }
    }
}
