//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod auth;
pub mod cache;
pub mod database;
pub mod export;
pub mod logging;
pub mod reports;
pub mod storage;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::cache::CacheConfig;
pub use self::database::DatabaseConfig;
pub use self::export::{CsvExportConfig, ExportConfig, PageOrientation, PaperSize, PdfExportConfig};
pub use self::logging::LoggingConfig;
pub use self::reports::ReportsConfig;
pub use self::storage::StorageConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "ASSETDESK";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (base file + environment overlay + env vars).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Token verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// File storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Report pipeline settings.
    #[serde(default)]
    pub reports: ReportsConfig,
    /// Per-format rendering options.
    #[serde(default)]
    pub export: ExportConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges the base file at `path`, an optional overlay named after the
    /// `ASSETDESK_ENV` environment (`config/{env}.toml`), and environment
    /// variables prefixed with `ASSETDESK__`.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let env = std::env::var("ASSETDESK_ENV").unwrap_or_else(|_| "development".to_string());
        let base = path.trim_end_matches(".toml");

        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        self.reports.cleanup_time()?;
        if self.reports.cleanup_batch_size == 0 {
            return Err(AppError::configuration(
                "reports.cleanup_batch_size must be greater than zero",
            ));
        }
        if self.worker.concurrency == 0 {
            return Err(AppError::configuration(
                "worker.concurrency must be greater than zero",
            ));
        }
        self.export.csv.delimiter_byte()?;
        self.export.csv.enclosure_byte()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/assetdesk".to_string(),
                max_connections: 5,
                min_connections: 1,
                connect_timeout_seconds: 5,
                idle_timeout_seconds: 60,
            },
            cache: CacheConfig::default(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            reports: ReportsConfig::default(),
            export: ExportConfig::default(),
            worker: WorkerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_bad_cleanup_time_rejected() {
        let mut config = minimal();
        config.reports.cleanup_time = "25:99".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multi_char_delimiter_rejected() {
        let mut config = minimal();
        config.export.csv.delimiter = ";;".to_string();
        assert!(config.validate().is_err());
    }
}
