//! Process configuration, read from the environment.
//!
//! There is no config file here (unlike the teacher's `%APPDATA%/config.json`)
//! — a stateless service reads its connection string and tunables from env
//! vars at startup, the same layering the teacher uses for defaultable
//! fields plus one required secret kept out of the defaultable path.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Tunables for the store adapter and the retry loop. `database_url` has
/// no default — it must be set, the way the teacher never defaults
/// `google_client_secret`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u8,
}

fn default_max_wait_ms() -> u64 {
    5_000
}
fn default_statement_timeout_ms() -> u64 {
    10_000
}
fn default_pool_max_size() -> usize {
    10
}
fn default_retry_attempts() -> u8 {
    1
}

impl Config {
    /// Reads `DATABASE_URL` (required) plus optional `RECONCILE_*`
    /// overrides for the store's time bounds and the retry loop.
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            database_url,
            max_wait_ms: env_or("RECONCILE_MAX_WAIT_MS", default_max_wait_ms()),
            statement_timeout_ms: env_or(
                "RECONCILE_STATEMENT_TIMEOUT_MS",
                default_statement_timeout_ms(),
            ),
            pool_max_size: env_or("RECONCILE_POOL_MAX_SIZE", default_pool_max_size()),
            retry_attempts: env_or("RECONCILE_RETRY_ATTEMPTS", default_retry_attempts()),
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
