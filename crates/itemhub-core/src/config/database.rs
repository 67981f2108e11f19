//! Database configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// PostgreSQL settings.
///
/// The CLI runs one task per process and a task holds a single
/// transaction, so the pool stays small.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    #[validate(length(min = 1))]
    pub url: String,
    /// Upper bound on pooled connections.
    #[serde(default = "default_pool_size")]
    #[validate(range(min = 1, max = 64))]
    pub pool_size: u32,
    /// Seconds to wait for a free connection before giving up.
    #[serde(default = "default_acquire_timeout")]
    #[validate(range(min = 1))]
    pub acquire_timeout_seconds: u64,
}

fn default_pool_size() -> u32 {
    4
}

fn default_acquire_timeout() -> u64 {
    5
}
