//! Store traits the report pipeline is written against.
//!
//! PostgreSQL implementations live in [`crate::repositories`]; in-memory
//! implementations for tests live in [`crate::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use assetdesk_core::result::AppResult;
use assetdesk_core::types::{JobId, PageRequest, PageResponse, ReportFileId, ReportId, UserId};
use assetdesk_entity::job::{CreateJob, Job};
use assetdesk_entity::report::{ReportDefinition, ReportStatus, ResourceQuery, Row};
use assetdesk_entity::report_file::{CreateReportFile, ReportFile};

/// Persistence for report definitions. Soft-deleted rows are invisible to
/// every method.
#[async_trait]
pub trait ReportStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a live definition by ID.
    async fn find_by_id(&self, id: ReportId) -> AppResult<Option<ReportDefinition>>;

    /// List definitions newest first. `viewer = None` lists everything;
    /// otherwise only the viewer's own and public definitions.
    async fn list_visible(
        &self,
        viewer: Option<UserId>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ReportDefinition>>;

    /// Insert a new definition.
    async fn create(&self, report: &ReportDefinition) -> AppResult<ReportDefinition>;

    /// Persist the editable fields of `report`.
    async fn update(&self, report: &ReportDefinition) -> AppResult<ReportDefinition>;

    /// Soft-delete. Returns `false` if the definition was missing or already deleted.
    async fn soft_delete(&self, id: ReportId, now: DateTime<Utc>) -> AppResult<bool>;

    /// All live definitions with `is_scheduled = true`.
    async fn find_active_scheduled(&self) -> AppResult<Vec<ReportDefinition>>;

    /// Atomically mark a report `processing` with `last_run_at = now`.
    ///
    /// Succeeds only if the report is live, its `last_run_at` still equals
    /// `observed_last_run`, and it is not processing. A run still marked
    /// processing whose last update is older than `stale_before` is taken
    /// over. Overlapping scheduler passes that read the same snapshot claim
    /// each report at most once.
    async fn claim_for_run(
        &self,
        id: ReportId,
        observed_last_run: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Record the outcome of a run.
    async fn mark_status(
        &self,
        id: ReportId,
        status: ReportStatus,
        error_message: Option<&str>,
    ) -> AppResult<()>;
}

/// Persistence for generated report files.
#[async_trait]
pub trait ReportFileStore: Send + Sync + std::fmt::Debug + 'static {
    /// Record a generated file.
    async fn create(&self, data: &CreateReportFile) -> AppResult<ReportFile>;

    /// Find a file by ID.
    async fn find_by_id(&self, id: ReportFileId) -> AppResult<Option<ReportFile>>;

    /// A report's files, newest first.
    async fn list_by_report(&self, report_id: ReportId) -> AppResult<Vec<ReportFile>>;

    /// Delete a file row. Returns `false` if it was already gone.
    async fn delete(&self, id: ReportFileId) -> AppResult<bool>;

    /// Files with `expires_at <= cutoff` and `id > after`, ordered by id.
    async fn find_expired_batch(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<ReportFileId>,
        limit: i64,
    ) -> AppResult<Vec<ReportFile>>;
}

/// Job counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    /// Waiting jobs.
    pub pending: i64,
    /// Jobs currently executing.
    pub running: i64,
    /// Finished jobs.
    pub completed: i64,
    /// Permanently failed jobs.
    pub failed: i64,
    /// Cancelled jobs.
    pub cancelled: i64,
}

/// Durable job queue storage.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a pending job.
    async fn create(&self, data: &CreateJob) -> AppResult<Job>;

    /// Find a job by ID.
    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>>;

    /// Claim the most urgent runnable job of `queue`, marking it running and
    /// incrementing its attempt count. Concurrent claimers never receive the
    /// same job.
    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Job>>;

    /// Mark a job completed.
    async fn complete(&self, id: JobId, result: Option<&serde_json::Value>) -> AppResult<()>;

    /// Mark a job failed for good.
    async fn fail(&self, id: JobId, error_message: &str) -> AppResult<()>;

    /// Return a job to pending, runnable from `run_at`.
    async fn retry(&self, id: JobId, error_message: &str, run_at: DateTime<Utc>) -> AppResult<()>;

    /// Release `running` jobs of `queue` started before `started_before`,
    /// whose worker is presumed gone. Jobs with attempts left return to
    /// pending; the rest fail. Returns the number of jobs released.
    async fn release_stale(&self, queue: &str, started_before: DateTime<Utc>) -> AppResult<u64>;

    /// Counts by status, optionally for one queue.
    async fn stats(&self, queue: Option<&str>) -> AppResult<JobStats>;

    /// Most recently created jobs.
    async fn list_recent(&self, limit: i64) -> AppResult<Vec<Job>>;
}

/// Read access to the host application's resource tables.
#[async_trait]
pub trait RowSource: Send + Sync + std::fmt::Debug + 'static {
    /// Number of rows matching the query's filters.
    async fn count(&self, query: &ResourceQuery) -> AppResult<i64>;

    /// One page of rows, projected to the query's columns, in sort order.
    async fn fetch(&self, query: &ResourceQuery, offset: i64, limit: i64) -> AppResult<Vec<Row>>;
}
