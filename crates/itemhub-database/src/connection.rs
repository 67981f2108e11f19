//! PostgreSQL connection pool management.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

use itemhub_core::config::DatabaseConfig;
use itemhub_core::error::{AppError, ErrorKind};
use itemhub_core::result::AppResult;

use crate::repositories::PgTransaction;
use crate::store::{Transaction, TransactionManager};

/// Wrapper around the sqlx PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    /// The underlying sqlx connection pool.
    pool: PgPool,
}

impl DatabasePool {
    /// Open the item store's pool.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let target = redact_credentials(&config.url);
        debug!(url = %target, pool_size = config.pool_size, "Opening item store");

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Cannot reach item store at {target}: {e}"),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Item store closed");
    }
}

#[async_trait]
impl TransactionManager for DatabasePool {
    async fn begin(&self) -> AppResult<Box<dyn Transaction>> {
        let inner = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        Ok(Box::new(PgTransaction::new(inner)))
    }
}

/// Replace the password in a connection URL with `****`.
fn redact_credentials(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_credentials() {
        assert_eq!(
            redact_credentials("postgres://itemhub:s3cr@t@db:5432/itemhub"),
            "postgres://itemhub:****@db:5432/itemhub"
        );
        assert_eq!(
            redact_credentials("postgres://itemhub@db/itemhub"),
            "postgres://itemhub@db/itemhub"
        );
        assert_eq!(
            redact_credentials("postgres://db:5432/itemhub"),
            "postgres://db:5432/itemhub"
        );
    }
}
