//! The closed set of task kinds.

use uuid::Uuid;

use itemhub_core::types::{AccountId, ItemId, MembershipId};
use itemhub_entity::{CreateItemInput, Item, ItemMembership, PermissionLevel, UpdateItemInput};

/// Task name of [`TaskKind::CreateItem`].
pub const CREATE_ITEM: &str = "create-item";
/// Task name of [`TaskKind::GetItem`].
pub const GET_ITEM: &str = "get-item";
/// Task name of [`TaskKind::GetItemChildren`].
pub const GET_ITEM_CHILDREN: &str = "get-item-children";
/// Task name of [`TaskKind::UpdateItem`].
pub const UPDATE_ITEM: &str = "update-item";
/// Task name of [`TaskKind::MoveItem`].
pub const MOVE_ITEM: &str = "move-item";
/// Task name of [`TaskKind::CopyItem`] and its per-node subtasks.
pub const COPY_ITEM: &str = "copy-item";
/// Task name of [`TaskKind::DeleteItem`] and its per-node subtasks.
pub const DELETE_ITEM: &str = "delete-item";
/// Task name of [`TaskKind::CreateItemMembership`].
pub const CREATE_ITEM_MEMBERSHIP: &str = "create-item-membership";
/// Task name of [`TaskKind::UpdateItemMembership`].
pub const UPDATE_ITEM_MEMBERSHIP: &str = "update-item-membership";
/// Task name of [`TaskKind::DeleteItemMembership`].
pub const DELETE_ITEM_MEMBERSHIP: &str = "delete-item-membership";
/// Task name of [`TaskKind::GetItemMemberships`].
pub const GET_ITEM_MEMBERSHIPS: &str = "get-item-memberships";

/// What a task does, with its input.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    /// Create an item under `parent_id`, or as a new root.
    CreateItem {
        input: CreateItemInput,
        parent_id: Option<ItemId>,
    },
    /// Read one item.
    GetItem { item_id: ItemId },
    /// Read the direct children of an item.
    GetItemChildren { item_id: ItemId },
    /// Patch an item's name, description, extra or settings.
    UpdateItem {
        item_id: ItemId,
        patch: UpdateItemInput,
    },
    /// Move an item and its subtree under `parent_id`, or to root.
    MoveItem {
        item_id: ItemId,
        parent_id: Option<ItemId>,
    },
    /// Copy an item and its subtree under `parent_id`, or to root.
    CopyItem {
        item_id: ItemId,
        parent_id: Option<ItemId>,
    },
    /// Subtask of a copy: insert one prepared clone.
    CopyItemNode {
        item: Item,
        grant: Option<ItemMembership>,
        attach_to: Option<ItemId>,
    },
    /// Delete an item and its subtree.
    DeleteItem { item_id: ItemId },
    /// Subtask of a delete: remove one node.
    DeleteItemNode { item_id: ItemId },
    /// Share an item with an account.
    CreateItemMembership {
        item_id: ItemId,
        account_id: AccountId,
        permission: PermissionLevel,
    },
    /// Change the level of a grant.
    UpdateItemMembership {
        membership_id: MembershipId,
        permission: PermissionLevel,
    },
    /// Revoke a grant, optionally with the account's grants further down.
    DeleteItemMembership {
        membership_id: MembershipId,
        purge_below: bool,
    },
    /// Effective grant per account at an item.
    GetItemMemberships { item_id: ItemId },
}

impl TaskKind {
    /// Task name used for logging and hook lookup. Subtasks share the name
    /// of the task that spawned them.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateItem { .. } => CREATE_ITEM,
            Self::GetItem { .. } => GET_ITEM,
            Self::GetItemChildren { .. } => GET_ITEM_CHILDREN,
            Self::UpdateItem { .. } => UPDATE_ITEM,
            Self::MoveItem { .. } => MOVE_ITEM,
            Self::CopyItem { .. } | Self::CopyItemNode { .. } => COPY_ITEM,
            Self::DeleteItem { .. } | Self::DeleteItemNode { .. } => DELETE_ITEM,
            Self::CreateItemMembership { .. } => CREATE_ITEM_MEMBERSHIP,
            Self::UpdateItemMembership { .. } => UPDATE_ITEM_MEMBERSHIP,
            Self::DeleteItemMembership { .. } => DELETE_ITEM_MEMBERSHIP,
            Self::GetItemMemberships { .. } => GET_ITEM_MEMBERSHIPS,
        }
    }

    /// Id of the entity the task acts on, if it exists yet.
    pub fn target_id(&self) -> Option<Uuid> {
        match self {
            Self::CreateItem { .. } => None,
            Self::GetItem { item_id }
            | Self::GetItemChildren { item_id }
            | Self::UpdateItem { item_id, .. }
            | Self::MoveItem { item_id, .. }
            | Self::CopyItem { item_id, .. }
            | Self::DeleteItem { item_id }
            | Self::DeleteItemNode { item_id }
            | Self::CreateItemMembership { item_id, .. }
            | Self::GetItemMemberships { item_id } => Some(item_id.into_uuid()),
            Self::CopyItemNode { item, .. } => Some(item.id.into_uuid()),
            Self::UpdateItemMembership { membership_id, .. }
            | Self::DeleteItemMembership { membership_id, .. } => Some(membership_id.into_uuid()),
        }
    }

    /// Whether subtasks spawned by this kind run in their own savepoints by
    /// default.
    pub fn default_partial_subtasks(&self) -> bool {
        matches!(self, Self::CopyItem { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtasks_share_parent_name() {
        let node = TaskKind::DeleteItemNode {
            item_id: ItemId::new(),
        };
        assert_eq!(node.name(), DELETE_ITEM);
    }

    #[test]
    fn test_target_id() {
        let id = ItemId::new();
        let kind = TaskKind::MoveItem {
            item_id: id,
            parent_id: None,
        };
        assert_eq!(kind.target_id(), Some(id.into_uuid()));
        assert!(
            TaskKind::CreateItem {
                input: CreateItemInput::new("a", "folder"),
                parent_id: None,
            }
            .target_id()
            .is_none()
        );
    }
}
