//! PostgreSQL transaction wrapper.

use async_trait::async_trait;
use sqlx::Postgres;

use itemhub_core::error::{AppError, ErrorKind};
use itemhub_core::result::AppResult;
use itemhub_core::types::ItemId;
use itemhub_core::types::path::id_to_segment;

use crate::store::{ItemStore, MembershipStore, Transaction};

/// A transaction (or savepoint) on a PostgreSQL connection.
///
/// Implements both [`ItemStore`] and [`MembershipStore`] directly.
pub struct PgTransaction<'c> {
    pub(crate) inner: sqlx::Transaction<'c, Postgres>,
}

impl<'c> PgTransaction<'c> {
    /// Wrap an open sqlx transaction.
    pub fn new(inner: sqlx::Transaction<'c, Postgres>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<'c> Transaction for PgTransaction<'c> {
    async fn begin_nested(&mut self) -> AppResult<Box<dyn Transaction + '_>> {
        let nested = sqlx::Acquire::begin(&mut self.inner).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to open savepoint", e)
        })?;
        Ok(Box::new(PgTransaction::new(nested)))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.inner.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.inner.rollback().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to roll back transaction", e)
        })
    }

    async fn lock_tree(&mut self, root: ItemId) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(id_to_segment(root))
            .execute(&mut *self.inner)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock tree", e))?;
        Ok(())
    }

    fn items(&mut self) -> &mut dyn ItemStore {
        self
    }

    fn memberships(&mut self) -> &mut dyn MembershipStore {
        self
    }
}
