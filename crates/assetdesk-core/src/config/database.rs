//! `[database]`: where report definitions, files and jobs are stored.

use serde::{Deserialize, Serialize};

/// PostgreSQL pool settings. The pool also reads the host application's
/// asset and user tables when resolving report rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` URL; the password is masked whenever it is printed.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Clamped to `max_connections` when the pool is built.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// How long to wait for a free connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Idle connections above the minimum are closed after this long.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    300
}
