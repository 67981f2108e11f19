//! Task results.

use serde::Serialize;

use itemhub_entity::{Item, ItemMembership};

/// Value produced by a successful task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum TaskOutput {
    /// Nothing (skipped task).
    None,
    /// A single item.
    Item(Item),
    /// A list of items.
    Items(Vec<Item>),
    /// A single membership.
    Membership(ItemMembership),
    /// A list of memberships.
    Memberships(Vec<ItemMembership>),
}

impl TaskOutput {
    /// The item, if this output holds one.
    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    /// The items, if this output holds a list.
    pub fn as_items(&self) -> Option<&[Item]> {
        match self {
            Self::Items(items) => Some(items),
            _ => None,
        }
    }

    /// The membership, if this output holds one.
    pub fn as_membership(&self) -> Option<&ItemMembership> {
        match self {
            Self::Membership(membership) => Some(membership),
            _ => None,
        }
    }

    /// The memberships, if this output holds a list.
    pub fn as_memberships(&self) -> Option<&[ItemMembership]> {
        match self {
            Self::Memberships(memberships) => Some(memberships),
            _ => None,
        }
    }

    /// Take the item out of this output.
    pub fn into_item(self) -> Option<Item> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    /// Take the membership out of this output.
    pub fn into_membership(self) -> Option<ItemMembership> {
        match self {
            Self::Membership(membership) => Some(membership),
            _ => None,
        }
    }
}
