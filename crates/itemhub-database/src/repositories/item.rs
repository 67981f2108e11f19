//! Item store implementation for PostgreSQL.
//!
//! Subtree queries use `starts_with(path, prefix)` rather than `LIKE`, since
//! the encoded path alphabet contains `_`.

use async_trait::async_trait;

use itemhub_core::error::{AppError, ErrorKind};
use itemhub_core::result::AppResult;
use itemhub_core::types::path::PATH_SEPARATOR;
use itemhub_core::types::{ItemId, ItemPath};
use itemhub_entity::Item;

use super::transaction::PgTransaction;
use crate::store::ItemStore;

/// Depth of an encoded path, as a SQL expression over `path`.
const DEPTH_SQL: &str = "array_length(string_to_array(path, '.'), 1)";

/// Prefix shared by the encoded paths of every strict descendant.
pub(crate) fn subtree_prefix(path: &ItemPath) -> String {
    format!("{}{}", path.encode(), PATH_SEPARATOR)
}

#[async_trait]
impl<'c> ItemStore for PgTransaction<'c> {
    async fn get(&mut self, id: ItemId) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.inner)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find item", e))?
            .ok_or_else(|| AppError::item_not_found(id))
    }

    async fn get_children(&mut self, parent: &ItemPath) -> AppResult<Vec<Item>> {
        let sql = format!(
            "SELECT * FROM items WHERE starts_with(path, $1) AND {DEPTH_SQL} = $2 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Item>(&sql)
            .bind(subtree_prefix(parent))
            .bind((parent.depth() + 1) as i32)
            .fetch_all(&mut *self.inner)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    async fn get_descendants(&mut self, path: &ItemPath) -> AppResult<Vec<Item>> {
        sqlx::query_as::<_, Item>(
            "SELECT * FROM items WHERE starts_with(path, $1) \
             ORDER BY length(path) ASC, created_at ASC, id ASC",
        )
        .bind(subtree_prefix(path))
        .fetch_all(&mut *self.inner)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list descendants", e))
    }

    async fn get_number_of_children(&mut self, parent: &ItemPath) -> AppResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM items WHERE starts_with(path, $1) AND {DEPTH_SQL} = $2");
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(subtree_prefix(parent))
            .bind((parent.depth() + 1) as i32)
            .fetch_one(&mut *self.inner)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count children", e)
            })?;
        Ok(count as u64)
    }

    async fn get_number_of_descendants(&mut self, path: &ItemPath) -> AppResult<u64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE starts_with(path, $1)")
                .bind(subtree_prefix(path))
                .fetch_one(&mut *self.inner)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count descendants", e)
                })?;
        Ok(count as u64)
    }

    async fn get_number_of_levels_to_farthest_child(
        &mut self,
        path: &ItemPath,
    ) -> AppResult<usize> {
        let sql = format!("SELECT MAX({DEPTH_SQL}) FROM items WHERE starts_with(path, $1)");
        let deepest = sqlx::query_scalar::<_, Option<i32>>(&sql)
            .bind(subtree_prefix(path))
            .fetch_one(&mut *self.inner)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to measure subtree depth", e)
            })?;
        Ok(deepest.map_or(0, |depth| (depth as usize).saturating_sub(path.depth())))
    }

    async fn create(&mut self, item: &Item) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(
            "INSERT INTO items (id, name, description, type, path, extra, settings, creator, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.item_type)
        .bind(&item.path)
        .bind(&item.extra)
        .bind(&item.settings)
        .bind(item.creator)
        .bind(item.created_at)
        .bind(item.updated_at)
        .fetch_one(&mut *self.inner)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create item", e))
    }

    async fn update(&mut self, item: &Item) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(
            "UPDATE items SET name = $2, description = $3, extra = $4, settings = $5, updated_at = $6 \
             WHERE id = $1 RETURNING *",
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.extra)
        .bind(&item.settings)
        .bind(item.updated_at)
        .fetch_optional(&mut *self.inner)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update item", e))?
        .ok_or_else(|| AppError::item_not_found(item.id))
    }

    async fn move_item(&mut self, item: &Item, new_parent: Option<&ItemPath>) -> AppResult<Item> {
        let new_path = match new_parent {
            Some(parent) => parent.child(item.id),
            None => ItemPath::root(item.id),
        };
        let old = item.path.encode();

        sqlx::query(
            "UPDATE items SET path = $2 || substr(path, length($1) + 1), \
             updated_at = CASE WHEN id = $3 THEN NOW() ELSE updated_at END \
             WHERE path = $1 OR starts_with(path, $4)",
        )
        .bind(&old)
        .bind(new_path.encode())
        .bind(item.id)
        .bind(subtree_prefix(&item.path))
        .execute(&mut *self.inner)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to move item", e))?;

        ItemStore::get(self, item.id).await
    }

    async fn delete(&mut self, id: ItemId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&mut *self.inner)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete item", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::item_not_found(id));
        }
        Ok(())
    }

    async fn delete_subtree(&mut self, path: &ItemPath) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM items WHERE path = $1 OR starts_with(path, $2)")
            .bind(path)
            .bind(subtree_prefix(path))
            .execute(&mut *self.inner)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete subtree", e)
            })?;
        Ok(result.rows_affected())
    }
}
