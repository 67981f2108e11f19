//! Transactional store contracts.
//!
//! Every read and write goes through a [`Transaction`]. The task runner is
//! the only component that opens one, so the same operation code runs
//! unchanged against PostgreSQL and against [`crate::MemoryDatabase`].

use async_trait::async_trait;

use itemhub_core::result::AppResult;
use itemhub_core::types::{AccountId, ItemId, ItemPath, MembershipId};
use itemhub_entity::{Item, ItemMembership, PermissionLevel};

use crate::inheritance::{self, MoveHousekeeping};

/// Source of top-level transactions.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Open a new top-level transaction.
    async fn begin(&self) -> AppResult<Box<dyn Transaction>>;
}

/// A transactional session over the item and membership stores.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait Transaction: Send {
    /// Open a nested transaction (savepoint). Committing it folds its
    /// writes into `self`; rolling it back discards only its own writes.
    async fn begin_nested(&mut self) -> AppResult<Box<dyn Transaction + '_>>;

    /// Commit all writes.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard all writes.
    async fn rollback(self: Box<Self>) -> AppResult<()>;

    /// Serialize structural mutations of the tree rooted at `root` until
    /// this transaction ends.
    async fn lock_tree(&mut self, root: ItemId) -> AppResult<()>;

    /// Item store bound to this transaction.
    fn items(&mut self) -> &mut dyn ItemStore;

    /// Membership store bound to this transaction.
    fn memberships(&mut self) -> &mut dyn MembershipStore;
}

/// Persistence of items, with tree queries keyed by path prefix.
#[async_trait]
pub trait ItemStore: Send {
    /// Load an item, failing with `ITEM_NOT_FOUND` if it does not exist.
    async fn get(&mut self, id: ItemId) -> AppResult<Item>;

    /// Direct children of `parent`, oldest first.
    async fn get_children(&mut self, parent: &ItemPath) -> AppResult<Vec<Item>>;

    /// All strict descendants of `path`, parents before children.
    async fn get_descendants(&mut self, path: &ItemPath) -> AppResult<Vec<Item>>;

    /// Number of direct children of `parent`.
    async fn get_number_of_children(&mut self, parent: &ItemPath) -> AppResult<u64>;

    /// Number of strict descendants of `path`.
    async fn get_number_of_descendants(&mut self, path: &ItemPath) -> AppResult<u64>;

    /// Levels between `path` and its deepest descendant (0 for a leaf).
    async fn get_number_of_levels_to_farthest_child(&mut self, path: &ItemPath)
    -> AppResult<usize>;

    /// Insert a new item.
    async fn create(&mut self, item: &Item) -> AppResult<Item>;

    /// Persist name, description, extra and settings of an existing item.
    async fn update(&mut self, item: &Item) -> AppResult<Item>;

    /// Re-root `item` and its whole subtree under `new_parent` (or make it a
    /// root). Memberships follow their items.
    async fn move_item(&mut self, item: &Item, new_parent: Option<&ItemPath>) -> AppResult<Item>;

    /// Delete a single item and the memberships attached to it.
    async fn delete(&mut self, id: ItemId) -> AppResult<()>;

    /// Delete `path` and every descendant in one statement. Returns the
    /// number of items removed.
    async fn delete_subtree(&mut self, path: &ItemPath) -> AppResult<u64>;
}

/// Conjunctive filter over memberships. Unset fields match everything, but
/// an entirely empty filter is rejected by the stores.
#[derive(Debug, Clone, Default)]
pub struct MembershipFilter {
    /// Only these memberships.
    pub ids: Option<Vec<MembershipId>>,
    /// Only grants held by this account.
    pub account_id: Option<AccountId>,
    /// Only grants strictly below this path.
    pub below: Option<ItemPath>,
    /// Only grants at most this permissive.
    pub at_most: Option<PermissionLevel>,
}

impl MembershipFilter {
    /// Filter selecting an explicit set of memberships.
    pub fn by_ids(ids: Vec<MembershipId>) -> Self {
        Self {
            ids: Some(ids),
            ..Self::default()
        }
    }

    /// Whether no condition is set.
    pub fn is_empty(&self) -> bool {
        self.ids.is_none()
            && self.account_id.is_none()
            && self.below.is_none()
            && self.at_most.is_none()
    }

    /// Evaluate the filter against one membership.
    pub fn matches(&self, membership: &ItemMembership) -> bool {
        self.ids.as_ref().is_none_or(|ids| ids.contains(&membership.id))
            && self
                .account_id
                .is_none_or(|account| account == membership.account_id)
            && self
                .below
                .as_ref()
                .is_none_or(|below| below.is_ancestor_of(&membership.item_path))
            && self
                .at_most
                .is_none_or(|at_most| membership.permission <= at_most)
    }
}

/// Persistence of membership grants.
#[async_trait]
pub trait MembershipStore: Send {
    /// The grant `account` inherits at `path`: its grant at the closest of
    /// `path` and its ancestors.
    async fn get_inherited(
        &mut self,
        account: AccountId,
        path: &ItemPath,
    ) -> AppResult<Option<ItemMembership>>;

    /// The grant of `account` attached exactly at `path`.
    async fn get_for_member_at_item(
        &mut self,
        account: AccountId,
        path: &ItemPath,
    ) -> AppResult<Option<ItemMembership>>;

    /// Every grant attached at one of `paths`, shallowest first.
    async fn get_at_paths(&mut self, paths: &[ItemPath]) -> AppResult<Vec<ItemMembership>>;

    /// Every grant attached at `path` or below it, shallowest first.
    async fn get_in_subtree(&mut self, path: &ItemPath) -> AppResult<Vec<ItemMembership>>;

    /// Load a membership, failing with `MEMBERSHIP_NOT_FOUND`.
    async fn get(&mut self, id: MembershipId) -> AppResult<ItemMembership>;

    /// Insert grants. A second grant for the same (item, account) pair
    /// fails with `MEMBERSHIP_CONFLICT`.
    async fn create_many(
        &mut self,
        memberships: &[ItemMembership],
    ) -> AppResult<Vec<ItemMembership>>;

    /// Change the level of an existing grant.
    async fn update_permission(
        &mut self,
        id: MembershipId,
        permission: PermissionLevel,
    ) -> AppResult<ItemMembership>;

    /// Count the grants matching `filter`.
    async fn count_matching(&mut self, filter: &MembershipFilter) -> AppResult<u64>;

    /// Delete the grants matching `filter`, returning how many were removed.
    async fn delete_many_matching(&mut self, filter: &MembershipFilter) -> AppResult<u64>;

    /// Membership changes needed to move `item` under `new_parent`.
    ///
    /// Must be called before the paths are rewritten.
    async fn move_housekeeping(
        &mut self,
        actor: AccountId,
        item: &Item,
        new_parent: Option<&ItemPath>,
    ) -> AppResult<MoveHousekeeping> {
        let new_path = match new_parent {
            Some(parent) => parent.child(item.id),
            None => ItemPath::root(item.id),
        };
        let new_chain = match new_parent {
            Some(parent) => parent.ancestors_or_self(),
            None => Vec::new(),
        };

        let old_grants = self.get_at_paths(&item.path.ancestors()).await?;
        let new_grants = self.get_at_paths(&new_chain).await?;
        let subtree = self.get_in_subtree(&item.path).await?;

        Ok(inheritance::compute_move_housekeeping(
            actor,
            &item.path,
            &new_path,
            &old_grants,
            &new_grants,
            &subtree,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(path: &ItemPath, account: AccountId, permission: PermissionLevel) -> ItemMembership {
        ItemMembership::new(path.clone(), account, permission, account)
    }

    #[test]
    fn test_filter_conditions_are_conjunctive() {
        let account = AccountId::new();
        let root = ItemPath::root(ItemId::new());
        let child = root.child(ItemId::new());

        let filter = MembershipFilter {
            account_id: Some(account),
            below: Some(root.clone()),
            at_most: Some(PermissionLevel::Write),
            ..MembershipFilter::default()
        };

        assert!(filter.matches(&grant(&child, account, PermissionLevel::Read)));
        assert!(!filter.matches(&grant(&child, account, PermissionLevel::Admin)));
        assert!(!filter.matches(&grant(&root, account, PermissionLevel::Read)));
        assert!(!filter.matches(&grant(&child, AccountId::new(), PermissionLevel::Read)));
    }

    #[test]
    fn test_empty_filter_detection() {
        assert!(MembershipFilter::default().is_empty());
        assert!(!MembershipFilter::by_ids(vec![]).is_empty());
    }
}
