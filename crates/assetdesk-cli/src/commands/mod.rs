//! CLI command definitions and dispatch.

pub mod config;
pub mod migrate;
pub mod reports;
pub mod token;
pub mod worker;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use assetdesk_cache::CacheManager;
use assetdesk_core::config::AppConfig;
use assetdesk_core::error::AppError;
use assetdesk_database::DatabasePool;
use assetdesk_service::{Pipeline, Stores};
use assetdesk_storage::StorageManager;

use crate::output::OutputFormat;

/// AssetDesk report pipeline operations
#[derive(Debug, Parser)]
#[command(name = "assetdesk", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scheduled reports and file cleanup
    Reports(reports::ReportsArgs),
    /// Job queue management
    Worker(worker::WorkerArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Configuration inspection
    Config(config::ConfigArgs),
    /// Bearer token management
    Token(token::TokenArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<ExitCode, AppError> {
        let config = load_config(&self.config)?;
        match &self.command {
            Commands::Reports(args) => reports::execute(args, &config, self.format).await,
            Commands::Worker(args) => worker::execute(args, &config, self.format).await,
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Config(args) => config::execute(args, &config, self.format),
            Commands::Token(args) => token::execute(args, &config, self.format),
        }
    }
}

/// Load configuration from file and environment.
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Connect to PostgreSQL and build the pipeline over it.
pub async fn connect(config: &AppConfig) -> Result<(DatabasePool, Pipeline), AppError> {
    let db = DatabasePool::connect(&config.database).await?;
    let storage = Arc::new(StorageManager::from_config(&config.storage).await?);
    let cache = Arc::new(CacheManager::new(&config.cache));
    let pipeline = Pipeline::build(config, Stores::postgres(&db), storage, cache);
    Ok((db, pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_cleanup_flags() {
        let cli = Cli::try_parse_from([
            "assetdesk",
            "--format",
            "json",
            "reports",
            "cleanup",
            "--days",
            "7",
            "--dry-run",
            "--batch-size",
            "50",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Reports(reports::ReportsArgs {
                command:
                    reports::ReportsCommand::Cleanup {
                        days,
                        dry_run,
                        batch_size,
                    },
            }) => {
                assert_eq!(days, Some(7));
                assert!(dry_run);
                assert_eq!(batch_size, Some(50));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_token_role_is_validated() {
        let err = Cli::try_parse_from([
            "assetdesk",
            "token",
            "issue",
            "--user",
            "7d0c9f1e-2a44-4b83-9d55-3f1e6a0b2c11",
            "--role",
            "root",
        ]);
        assert!(err.is_err());
    }
}
