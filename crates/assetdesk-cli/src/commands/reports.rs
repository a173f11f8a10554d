//! Scheduled report and cleanup commands.

use std::process::ExitCode;

use chrono::Utc;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use assetdesk_core::config::{AppConfig, ReportsConfig};
use assetdesk_core::error::AppError;
use assetdesk_database::ReportStore;
use assetdesk_entity::report::ReportDefinition;
use assetdesk_service::CleanupOptions;
use assetdesk_service::report::next_run;

use crate::output::{self, OutputFormat};

/// Arguments for report commands
#[derive(Debug, Args)]
pub struct ReportsArgs {
    /// Reports subcommand
    #[command(subcommand)]
    pub command: ReportsCommand,
}

/// Report subcommands
#[derive(Debug, Subcommand)]
pub enum ReportsCommand {
    /// Dispatch every scheduled report that is due now
    RunScheduled,
    /// Delete expired report files
    Cleanup {
        /// Only delete files that expired at least this many days ago
        #[arg(long)]
        days: Option<i64>,
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
        /// Rows fetched per batch
        #[arg(long)]
        batch_size: Option<i64>,
    },
    /// List scheduled reports with their next run
    ListScheduled,
}

/// Scheduled report display row
#[derive(Debug, Serialize, Tabled)]
struct ScheduledRow {
    id: String,
    name: String,
    frequency: String,
    day: String,
    time: String,
    format: String,
    status: String,
    last_run: String,
    next_run: String,
}

impl ScheduledRow {
    fn new(report: &ReportDefinition, now: chrono::DateTime<Utc>) -> Self {
        let next = next_run(&report.schedule(), report.last_run_at, now);
        Self {
            id: report.id.to_string(),
            name: report.name.clone(),
            frequency: report
                .frequency
                .map(|f| f.to_string())
                .unwrap_or_else(|| "-".to_string()),
            day: report.schedule_day.clone().unwrap_or_else(|| "-".to_string()),
            time: report
                .schedule_time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
            format: report.format.to_string(),
            status: report.status.to_string(),
            last_run: timestamp(report.last_run_at),
            next_run: timestamp(next),
        }
    }
}

fn timestamp(at: Option<chrono::DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Cleanup options from flags, falling back to configuration.
fn cleanup_options(
    config: &ReportsConfig,
    days: Option<i64>,
    dry_run: bool,
    batch_size: Option<i64>,
) -> Result<CleanupOptions, AppError> {
    if days.is_some_and(|d| d < 0) {
        return Err(AppError::validation("--days must not be negative"));
    }
    if batch_size.is_some_and(|b| b < 1) {
        return Err(AppError::validation("--batch-size must be at least 1"));
    }
    let retention = config.cleanup_retention_days;
    let options = CleanupOptions {
        days: days.or((retention > 0).then_some(retention)),
        dry_run,
        batch_size: batch_size.unwrap_or(config.cleanup_batch_size),
    };
    options.cutoff(Utc::now())?;
    Ok(options)
}

/// Execute report commands
pub async fn execute(
    args: &ReportsArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<ExitCode, AppError> {
    match &args.command {
        ReportsCommand::RunScheduled => {
            let (db, pipeline) = super::connect(config).await?;
            let summary = pipeline.dispatcher.run(Utc::now()).await;
            db.close().await;
            output::print_summary("Scheduled report check", &summary?, format);
            Ok(ExitCode::SUCCESS)
        }
        ReportsCommand::Cleanup {
            days,
            dry_run,
            batch_size,
        } => {
            let options = cleanup_options(&config.reports, *days, *dry_run, *batch_size)?;
            let (db, pipeline) = super::connect(config).await?;
            let summary = pipeline.cleanup.run(options, Utc::now()).await;
            db.close().await;
            let summary = summary?;

            output::print_summary("Report cleanup", &summary, format);
            if summary.failed > 0 {
                output::print_warning(&format!(
                    "{} file(s) could not be deleted; see logs",
                    summary.failed
                ));
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        ReportsCommand::ListScheduled => {
            let (db, pipeline) = super::connect(config).await?;
            let reports = pipeline.stores.reports.find_active_scheduled().await;
            db.close().await;

            let now = Utc::now();
            let rows: Vec<ScheduledRow> = reports?
                .iter()
                .map(|r| ScheduledRow::new(r, now))
                .collect();
            output::print_list(&rows, format);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_options_use_retention_when_days_absent() {
        let config = ReportsConfig {
            cleanup_retention_days: 14,
            cleanup_batch_size: 250,
            ..ReportsConfig::default()
        };

        let options = cleanup_options(&config, None, false, None).unwrap();
        assert_eq!(options.days, Some(14));
        assert_eq!(options.batch_size, 250);

        let options = cleanup_options(&config, Some(3), true, Some(10)).unwrap();
        assert_eq!(options.days, Some(3));
        assert!(options.dry_run);
        assert_eq!(options.batch_size, 10);
    }

    #[test]
    fn test_cleanup_options_reject_bad_flags() {
        let config = ReportsConfig::default();
        assert!(cleanup_options(&config, Some(-1), false, None).is_err());
        assert!(cleanup_options(&config, None, false, Some(0)).is_err());
        assert!(cleanup_options(&config, Some(100_000_000), false, None).is_err());
        assert_eq!(cleanup_options(&config, None, false, None).unwrap().days, None);
    }
}
