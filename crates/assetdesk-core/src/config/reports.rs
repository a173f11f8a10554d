//! Report pipeline configuration.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings for report generation, scheduling and cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Storage disk that receives generated files.
    #[serde(default = "default_disk")]
    pub disk: String,
    /// Directory prefix under the disk root.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Days a generated file stays downloadable.
    #[serde(default = "default_file_ttl_days")]
    pub file_ttl_days: i64,
    /// Extra days past expiry before the daily cleanup job deletes a file.
    #[serde(default)]
    pub cleanup_retention_days: i64,
    /// Time of day (UTC, `HH:MM`) for the daily cleanup job.
    #[serde(default = "default_cleanup_time")]
    pub cleanup_time: String,
    /// Rows fetched per cleanup batch.
    #[serde(default = "default_cleanup_batch_size")]
    pub cleanup_batch_size: i64,
    /// Exports with more rows than this are queued instead of run inline.
    #[serde(default = "default_async_threshold_rows")]
    pub async_threshold_rows: i64,
    /// Cron expression (with seconds) for the scheduled-report check.
    #[serde(default = "default_scheduler_cron")]
    pub scheduler_cron: String,
    /// Rows included in a report preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: i64,
    /// TTL for cached report previews.
    #[serde(default = "default_show_cache_ttl_seconds")]
    pub show_cache_ttl_seconds: u64,
    /// Rows fetched per page while streaming an export.
    #[serde(default = "default_stream_batch_size")]
    pub stream_batch_size: i64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            disk: default_disk(),
            directory: default_directory(),
            file_ttl_days: default_file_ttl_days(),
            cleanup_retention_days: 0,
            cleanup_time: default_cleanup_time(),
            cleanup_batch_size: default_cleanup_batch_size(),
            async_threshold_rows: default_async_threshold_rows(),
            scheduler_cron: default_scheduler_cron(),
            preview_rows: default_preview_rows(),
            show_cache_ttl_seconds: default_show_cache_ttl_seconds(),
            stream_batch_size: default_stream_batch_size(),
        }
    }
}

impl ReportsConfig {
    /// Parse `cleanup_time`.
    pub fn cleanup_time(&self) -> Result<NaiveTime, AppError> {
        NaiveTime::parse_from_str(&self.cleanup_time, "%H:%M").map_err(|e| {
            AppError::configuration(format!(
                "Invalid reports.cleanup_time '{}': {e}",
                self.cleanup_time
            ))
        })
    }

    /// Six-field cron expression firing daily at `cleanup_time`.
    pub fn cleanup_cron(&self) -> Result<String, AppError> {
        use chrono::Timelike;
        let time = self.cleanup_time()?;
        Ok(format!("0 {} {} * * *", time.minute(), time.hour()))
    }
}

fn default_disk() -> String {
    "local".to_string()
}

fn default_directory() -> String {
    "reports".to_string()
}

fn default_file_ttl_days() -> i64 {
    7
}

fn default_cleanup_time() -> String {
    "02:00".to_string()
}

fn default_cleanup_batch_size() -> i64 {
    100
}

fn default_async_threshold_rows() -> i64 {
    500
}

fn default_scheduler_cron() -> String {
    "0 * * * * *".to_string()
}

fn default_preview_rows() -> i64 {
    50
}

fn default_show_cache_ttl_seconds() -> u64 {
    300
}

fn default_stream_batch_size() -> i64 {
    200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_cron_from_time() {
        let config = ReportsConfig {
            cleanup_time: "03:15".to_string(),
            ..ReportsConfig::default()
        };
        assert_eq!(config.cleanup_cron().unwrap(), "0 15 3 * * *");
    }
}
