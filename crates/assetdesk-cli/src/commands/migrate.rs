//! Database migration commands.

use std::process::ExitCode;

use clap::{Args, Subcommand};

use assetdesk_core::config::AppConfig;
use assetdesk_core::error::AppError;
use assetdesk_database::DatabasePool;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<ExitCode, AppError> {
    match &args.command {
        MigrateCommand::Run => {
            let db = DatabasePool::connect(&config.database).await?;
            println!("Running database migrations...");
            let result = db.migrate().await;
            db.close().await;
            result?;
            output::print_success("All migrations applied successfully.");
        }
    }
    Ok(ExitCode::SUCCESS)
}
