//! Scheduled report dispatcher.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use assetdesk_core::result::AppResult;
use assetdesk_database::ReportStore;
use assetdesk_entity::job::{JobPayload, JobPriority};
use assetdesk_entity::report::{ReportDefinition, ReportStatus};

use super::schedule::is_due;
use crate::jobs::JobSubmitter;

/// Outcome of one dispatcher pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Scheduled definitions examined.
    pub checked: u64,
    /// Definitions whose schedule was due.
    pub due: u64,
    /// Generation jobs enqueued.
    pub dispatched: u64,
    /// Due definitions already claimed by another run.
    pub skipped: u64,
    /// Definitions whose claim or enqueue failed.
    pub failed: u64,
}

/// Scans scheduled definitions and enqueues generation jobs for due ones.
#[derive(Debug, Clone)]
pub struct DispatchService {
    reports: Arc<dyn ReportStore>,
    jobs: JobSubmitter,
    stale_after: TimeDelta,
}

enum Outcome {
    Dispatched,
    Skipped,
}

impl DispatchService {
    /// Creates a new dispatcher. A run left `processing` for longer than
    /// `stale_after` is treated as abandoned and may be claimed again.
    pub fn new(
        reports: Arc<dyn ReportStore>,
        jobs: JobSubmitter,
        stale_after: std::time::Duration,
    ) -> Self {
        Self {
            reports,
            jobs,
            stale_after: TimeDelta::from_std(stale_after).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Run one pass at `now`.
    ///
    /// A report is dispatched only after its atomic claim succeeds. The claim
    /// is conditional on the `last_run_at` this pass observed, so overlapping
    /// passes never enqueue the same period twice. Errors for one report are
    /// logged and counted without aborting the pass.
    pub async fn run(&self, now: DateTime<Utc>) -> AppResult<DispatchSummary> {
        let scheduled = self.reports.find_active_scheduled().await?;
        let mut summary = DispatchSummary {
            checked: scheduled.len() as u64,
            ..DispatchSummary::default()
        };

        for report in &scheduled {
            if !is_due(&report.schedule(), report.last_run_at, now) {
                continue;
            }
            summary.due += 1;

            match self.dispatch(report, now).await {
                Ok(Outcome::Dispatched) => summary.dispatched += 1,
                Ok(Outcome::Skipped) => {
                    tracing::debug!(report_id = %report.id, "Report already claimed, skipping");
                    summary.skipped += 1;
                }
                Err(err) => {
                    tracing::error!(report_id = %report.id, error = %err, "Failed to dispatch scheduled report");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            due = summary.due,
            dispatched = summary.dispatched,
            skipped = summary.skipped,
            failed = summary.failed,
            "Scheduled report check finished"
        );
        Ok(summary)
    }

    async fn dispatch(&self, report: &ReportDefinition, now: DateTime<Utc>) -> AppResult<Outcome> {
        let stale_before = now
            .checked_sub_signed(self.stale_after)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        if !self
            .reports
            .claim_for_run(report.id, report.last_run_at, now, stale_before)
            .await?
        {
            return Ok(Outcome::Skipped);
        }
        if report.status == ReportStatus::Processing {
            tracing::warn!(
                report_id = %report.id,
                last_run_at = ?report.last_run_at,
                "Took over abandoned report run"
            );
        }

        let payload = JobPayload::ReportGeneration {
            report_id: report.id,
            format: report.format,
            requested_by: None,
        };
        match self.jobs.submit(&payload, JobPriority::Normal, None).await {
            Ok(job) => {
                tracing::info!(report_id = %report.id, job_id = %job.id, "Scheduled report dispatched");
                Ok(Outcome::Dispatched)
            }
            Err(err) => {
                self.reports
                    .mark_status(report.id, ReportStatus::Failed, Some(&err.message))
                    .await?;
                Err(err)
            }
        }
    }
}
