//! Configuration inspection commands.

use std::process::ExitCode;

use clap::{Args, Subcommand};

use assetdesk_core::config::AppConfig;
use assetdesk_core::error::AppError;
use assetdesk_database::connection::mask_password;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration with secrets masked
    Show,
}

/// Execute config commands
pub fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<ExitCode, AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let masked = masked(config);
            match format {
                OutputFormat::Json => output::print_json(&masked),
                OutputFormat::Table => {
                    println!("Server:   {}:{}", masked.server.host, masked.server.port);
                    println!("Database: {}", masked.database.url);
                    println!(
                        "Storage:  {} (default disk '{}')",
                        masked.storage.data_root, masked.storage.default_disk
                    );
                    println!();
                    output::print_summary("Reports", &masked.reports, format);
                    output::print_summary("Worker", &masked.worker, format);
                    output::print_summary("Logging", &masked.logging, format);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn masked(config: &AppConfig) -> AppConfig {
    let mut masked = config.clone();
    masked.database.url = mask_password(&config.database.url);
    masked.auth.jwt_secret = "****".to_string();
    masked
}
