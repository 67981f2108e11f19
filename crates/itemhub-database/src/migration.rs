//! Schema migrations for the item store.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use itemhub_core::error::{AppError, ErrorKind};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply every migration the database has not seen yet.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Migration failed: {e}"), e)
    })?;

    let latest = MIGRATOR.iter().map(|m| m.version).max().unwrap_or_default();
    info!(latest, "Item store schema is up to date");
    Ok(())
}
