//! Item membership entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use itemhub_core::types::{AccountId, ItemPath, MembershipId};

use super::permission::PermissionLevel;

/// A permission grant for one account, attached to one item and inherited
/// by its whole subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ItemMembership {
    /// Unique membership identifier.
    pub id: MembershipId,
    /// Path of the item the grant is attached to.
    pub item_path: ItemPath,
    /// Account receiving the grant.
    pub account_id: AccountId,
    /// Granted level.
    pub permission: PermissionLevel,
    /// Account that created the grant.
    pub creator: AccountId,
    /// When the grant was created.
    pub created_at: DateTime<Utc>,
    /// When the grant was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ItemMembership {
    /// Build a new grant.
    pub fn new(
        item_path: ItemPath,
        account_id: AccountId,
        permission: PermissionLevel,
        creator: AccountId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: MembershipId::new(),
            item_path,
            account_id,
            permission,
            creator,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the grant is attached exactly at `path`.
    pub fn is_at(&self, path: &ItemPath) -> bool {
        &self.item_path == path
    }
}
