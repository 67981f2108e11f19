//! Membership store over the in-memory state.

use async_trait::async_trait;
use chrono::Utc;

use itemhub_core::error::AppError;
use itemhub_core::result::AppResult;
use itemhub_core::types::{AccountId, ItemPath, MembershipId};
use itemhub_entity::{ItemMembership, PermissionLevel};

use super::MemoryTransaction;
use crate::store::{MembershipFilter, MembershipStore};

fn sorted(mut memberships: Vec<ItemMembership>) -> Vec<ItemMembership> {
    memberships.sort_by(|a, b| {
        (a.item_path.depth(), a.created_at, a.id).cmp(&(b.item_path.depth(), b.created_at, b.id))
    });
    memberships
}

fn reject_empty(filter: &MembershipFilter) -> AppResult<()> {
    if filter.is_empty() {
        return Err(AppError::internal("Refusing to match every membership"));
    }
    Ok(())
}

#[async_trait]
impl<'p> MembershipStore for MemoryTransaction<'p> {
    async fn get_inherited(
        &mut self,
        account: AccountId,
        path: &ItemPath,
    ) -> AppResult<Option<ItemMembership>> {
        Ok(self
            .working
            .memberships
            .values()
            .filter(|m| m.account_id == account && m.item_path.contains(path))
            .max_by_key(|m| m.item_path.depth())
            .cloned())
    }

    async fn get_for_member_at_item(
        &mut self,
        account: AccountId,
        path: &ItemPath,
    ) -> AppResult<Option<ItemMembership>> {
        Ok(self
            .working
            .memberships
            .values()
            .find(|m| m.account_id == account && m.is_at(path))
            .cloned())
    }

    async fn get_at_paths(&mut self, paths: &[ItemPath]) -> AppResult<Vec<ItemMembership>> {
        let found = self
            .working
            .memberships
            .values()
            .filter(|m| paths.contains(&m.item_path))
            .cloned()
            .collect();
        Ok(sorted(found))
    }

    async fn get_in_subtree(&mut self, path: &ItemPath) -> AppResult<Vec<ItemMembership>> {
        let found = self
            .working
            .memberships
            .values()
            .filter(|m| path.contains(&m.item_path))
            .cloned()
            .collect();
        Ok(sorted(found))
    }

    async fn get(&mut self, id: MembershipId) -> AppResult<ItemMembership> {
        self.working
            .memberships
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::membership_not_found(id))
    }

    async fn create_many(
        &mut self,
        memberships: &[ItemMembership],
    ) -> AppResult<Vec<ItemMembership>> {
        for membership in memberships {
            let item_exists = self
                .working
                .items
                .values()
                .any(|item| item.path == membership.item_path);
            if !item_exists {
                return Err(AppError::item_not_found(membership.item_path.id()));
            }

            let conflict = self.working.memberships.values().any(|existing| {
                existing.account_id == membership.account_id
                    && existing.item_path == membership.item_path
            });
            if conflict {
                return Err(AppError::membership_conflict(format!(
                    "Account {} already has a membership at item {}",
                    membership.account_id,
                    membership.item_path.id()
                )));
            }

            self.working
                .memberships
                .insert(membership.id, membership.clone());
        }
        Ok(memberships.to_vec())
    }

    async fn update_permission(
        &mut self,
        id: MembershipId,
        permission: PermissionLevel,
    ) -> AppResult<ItemMembership> {
        let stored = self
            .working
            .memberships
            .get_mut(&id)
            .ok_or_else(|| AppError::membership_not_found(id))?;
        stored.permission = permission;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn count_matching(&mut self, filter: &MembershipFilter) -> AppResult<u64> {
        reject_empty(filter)?;
        Ok(self
            .working
            .memberships
            .values()
            .filter(|m| filter.matches(m))
            .count() as u64)
    }

    async fn delete_many_matching(&mut self, filter: &MembershipFilter) -> AppResult<u64> {
        reject_empty(filter)?;
        let before = self.working.memberships.len();
        self.working.memberships.retain(|_, m| !filter.matches(m));
        Ok((before - self.working.memberships.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;
    use crate::store::{ItemStore, TransactionManager};
    use itemhub_entity::{CreateItemInput, Item};

    #[tokio::test]
    async fn test_conflicting_grant_rejected() {
        let db = MemoryDatabase::new();
        let account = AccountId::new();
        let item = Item::new(CreateItemInput::new("a", "folder"), account, None);

        let mut tx = db.begin().await.unwrap();
        tx.items().create(&item).await.unwrap();
        let grant = ItemMembership::new(item.path.clone(), account, PermissionLevel::Admin, account);
        tx.memberships().create_many(&[grant]).await.unwrap();

        let again = ItemMembership::new(item.path.clone(), account, PermissionLevel::Read, account);
        let err = tx.memberships().create_many(&[again]).await.unwrap_err();
        assert_eq!(err.kind, itemhub_core::ErrorKind::MembershipConflict);
    }

    #[tokio::test]
    async fn test_memberships_follow_moved_items() {
        let db = MemoryDatabase::new();
        let account = AccountId::new();
        let root = Item::new(CreateItemInput::new("root", "folder"), account, None);
        let child = Item::new(CreateItemInput::new("child", "folder"), account, Some(&root.path));

        let mut tx = db.begin().await.unwrap();
        tx.items().create(&root).await.unwrap();
        tx.items().create(&child).await.unwrap();
        let grant = ItemMembership::new(child.path.clone(), account, PermissionLevel::Read, account);
        tx.memberships().create_many(&[grant.clone()]).await.unwrap();

        let moved = tx.items().move_item(&child, None).await.unwrap();
        assert!(moved.is_root());
        let stored = tx.memberships().get(grant.id).await.unwrap();
        assert_eq!(stored.item_path, moved.path);

        tx.items().delete_subtree(&moved.path).await.unwrap();
        assert!(tx.memberships().get(grant.id).await.is_err());
    }
}
