//! Membership store implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use itemhub_core::error::{AppError, ErrorKind};
use itemhub_core::result::AppResult;
use itemhub_core::types::{AccountId, ItemPath, MembershipId};
use itemhub_entity::{ItemMembership, PermissionLevel};

use super::item::subtree_prefix;
use super::transaction::PgTransaction;
use crate::store::{MembershipFilter, MembershipStore};

/// Map an insert failure, turning constraint violations into domain errors.
fn map_insert_error(e: sqlx::Error, membership: &ItemMembership) -> AppError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return AppError::membership_conflict(format!(
                "Account {} already has a membership at item {}",
                membership.account_id,
                membership.item_path.id()
            ));
        }
        if db.is_foreign_key_violation() {
            return AppError::item_not_found(membership.item_path.id());
        }
    }
    AppError::with_source(ErrorKind::Database, "Failed to create membership", e)
}

/// Append the `WHERE` conditions of `filter` to `builder`.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &MembershipFilter) -> AppResult<()> {
    if filter.is_empty() {
        return Err(AppError::internal("Refusing to match every membership"));
    }

    builder.push(" WHERE TRUE");
    if let Some(ids) = &filter.ids {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        builder.push(" AND id = ANY(").push_bind(ids).push(")");
    }
    if let Some(account) = filter.account_id {
        builder.push(" AND account_id = ").push_bind(account);
    }
    if let Some(below) = &filter.below {
        builder
            .push(" AND starts_with(item_path, ")
            .push_bind(subtree_prefix(below))
            .push(")");
    }
    if let Some(at_most) = filter.at_most {
        builder.push(" AND permission <= ").push_bind(at_most);
    }
    Ok(())
}

#[async_trait]
impl<'c> MembershipStore for PgTransaction<'c> {
    async fn get_inherited(
        &mut self,
        account: AccountId,
        path: &ItemPath,
    ) -> AppResult<Option<ItemMembership>> {
        let chain: Vec<String> = path.ancestors_or_self().iter().map(|p| p.encode()).collect();
        sqlx::query_as::<_, ItemMembership>(
            "SELECT * FROM item_memberships WHERE account_id = $1 AND item_path = ANY($2) \
             ORDER BY length(item_path) DESC LIMIT 1",
        )
        .bind(account)
        .bind(chain)
        .fetch_optional(&mut *self.inner)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to resolve inherited membership", e)
        })
    }

    async fn get_for_member_at_item(
        &mut self,
        account: AccountId,
        path: &ItemPath,
    ) -> AppResult<Option<ItemMembership>> {
        sqlx::query_as::<_, ItemMembership>(
            "SELECT * FROM item_memberships WHERE account_id = $1 AND item_path = $2",
        )
        .bind(account)
        .bind(path)
        .fetch_optional(&mut *self.inner)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find membership", e))
    }

    async fn get_at_paths(&mut self, paths: &[ItemPath]) -> AppResult<Vec<ItemMembership>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let encoded: Vec<String> = paths.iter().map(|p| p.encode()).collect();
        sqlx::query_as::<_, ItemMembership>(
            "SELECT * FROM item_memberships WHERE item_path = ANY($1) \
             ORDER BY length(item_path) ASC, created_at ASC",
        )
        .bind(encoded)
        .fetch_all(&mut *self.inner)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list memberships", e))
    }

    async fn get_in_subtree(&mut self, path: &ItemPath) -> AppResult<Vec<ItemMembership>> {
        sqlx::query_as::<_, ItemMembership>(
            "SELECT * FROM item_memberships WHERE item_path = $1 OR starts_with(item_path, $2) \
             ORDER BY length(item_path) ASC, created_at ASC",
        )
        .bind(path)
        .bind(subtree_prefix(path))
        .fetch_all(&mut *self.inner)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list subtree memberships", e)
        })
    }

    async fn get(&mut self, id: MembershipId) -> AppResult<ItemMembership> {
        sqlx::query_as::<_, ItemMembership>("SELECT * FROM item_memberships WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.inner)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find membership", e)
            })?
            .ok_or_else(|| AppError::membership_not_found(id))
    }

    async fn create_many(
        &mut self,
        memberships: &[ItemMembership],
    ) -> AppResult<Vec<ItemMembership>> {
        let mut created = Vec::with_capacity(memberships.len());
        for membership in memberships {
            let row = sqlx::query_as::<_, ItemMembership>(
                "INSERT INTO item_memberships (id, item_path, account_id, permission, creator, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
            )
            .bind(membership.id)
            .bind(&membership.item_path)
            .bind(membership.account_id)
            .bind(membership.permission)
            .bind(membership.creator)
            .bind(membership.created_at)
            .bind(membership.updated_at)
            .fetch_one(&mut *self.inner)
            .await
            .map_err(|e| map_insert_error(e, membership))?;
            created.push(row);
        }
        Ok(created)
    }

    async fn update_permission(
        &mut self,
        id: MembershipId,
        permission: PermissionLevel,
    ) -> AppResult<ItemMembership> {
        sqlx::query_as::<_, ItemMembership>(
            "UPDATE item_memberships SET permission = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(permission)
        .fetch_optional(&mut *self.inner)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update membership", e))?
        .ok_or_else(|| AppError::membership_not_found(id))
    }

    async fn count_matching(&mut self, filter: &MembershipFilter) -> AppResult<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM item_memberships");
        push_filter(&mut builder, filter)?;
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&mut *self.inner)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count memberships", e)
            })?;
        Ok(count as u64)
    }

    async fn delete_many_matching(&mut self, filter: &MembershipFilter) -> AppResult<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("DELETE FROM item_memberships");
        push_filter(&mut builder, filter)?;
        let result = builder
            .build()
            .execute(&mut *self.inner)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete memberships", e)
            })?;
        Ok(result.rows_affected())
    }
}
