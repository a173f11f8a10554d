//! Bearer token commands for operators and local testing.

use std::process::ExitCode;

use clap::{Args, Subcommand};
use serde::Serialize;

use assetdesk_auth::JwtEncoder;
use assetdesk_core::config::AppConfig;
use assetdesk_core::error::AppError;
use assetdesk_core::types::UserId;
use assetdesk_entity::user::UserRole;

use crate::output::{self, OutputFormat};

/// Arguments for token commands
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Token subcommand
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Issue a signed access token
    Issue {
        /// User ID the token is issued for
        #[arg(long)]
        user: uuid::Uuid,
        /// Role claim (`admin` or `user`)
        #[arg(long, default_value = "user", value_parser = parse_role)]
        role: UserRole,
        /// Username claim
        #[arg(long, default_value = "cli")]
        username: String,
    },
}

#[derive(Debug, Serialize)]
struct IssuedToken {
    token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

fn parse_role(value: &str) -> Result<UserRole, String> {
    value.parse::<UserRole>().map_err(|e| e.to_string())
}

/// Execute token commands
pub fn execute(
    args: &TokenArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<ExitCode, AppError> {
    match &args.command {
        TokenCommand::Issue {
            user,
            role,
            username,
        } => {
            let encoder = JwtEncoder::new(&config.auth);
            let (token, expires_at) = encoder.issue(UserId::from(*user), *role, username)?;
            match format {
                OutputFormat::Json => output::print_json(&IssuedToken { token, expires_at }),
                OutputFormat::Table => {
                    println!("{token}");
                    output::print_kv("expires_at", &expires_at.to_rfc3339());
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
