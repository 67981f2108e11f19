//! Item entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use itemhub_core::types::{AccountId, ItemId, ItemPath};

use super::input::{CreateItemInput, UpdateItemInput};

/// Item type whose `extra` may carry a child ordering list.
pub const FOLDER_TYPE: &str = "folder";

const FOLDER_EXTRA_KEY: &str = "folder";
const CHILDREN_ORDER_KEY: &str = "childrenOrder";

/// A node in the item forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique item identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Item type (`folder`, `document`, `link`, `app`, ...).
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub item_type: String,
    /// Materialized path, root first and this item last.
    pub path: ItemPath,
    /// Type-specific payload.
    pub extra: Value,
    /// Display and behaviour settings.
    pub settings: Value,
    /// Account that created the item.
    pub creator: AccountId,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
    /// When the item was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Build a new item under `parent` (or as a root when `None`).
    pub fn new(input: CreateItemInput, creator: AccountId, parent: Option<&ItemPath>) -> Self {
        let id = ItemId::new();
        let path = match parent {
            Some(parent) => parent.child(id),
            None => ItemPath::root(id),
        };
        let now = Utc::now();

        Self {
            id,
            name: input.name,
            description: input.description,
            item_type: input.item_type,
            path,
            extra: input.extra.unwrap_or_else(|| Value::Object(Map::new())),
            settings: input.settings.unwrap_or_else(|| Value::Object(Map::new())),
            creator,
            created_at: now,
            updated_at: now,
        }
    }

    /// Clone this item's content into a new node at `path`.
    pub fn duplicate(&self, path: ItemPath, creator: AccountId) -> Self {
        let now = Utc::now();
        Self {
            id: path.id(),
            name: self.name.clone(),
            description: self.description.clone(),
            item_type: self.item_type.clone(),
            path,
            extra: self.extra.clone(),
            settings: self.settings.clone(),
            creator,
            created_at: now,
            updated_at: now,
        }
    }

    /// Depth in the tree (root = 1).
    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    /// Path of the parent, or `None` for a root item.
    pub fn parent_path(&self) -> Option<ItemPath> {
        self.path.parent()
    }

    /// Id of the parent, or `None` for a root item.
    pub fn parent_id(&self) -> Option<ItemId> {
        self.path.parent().map(|p| p.id())
    }

    /// Check if this is a root item.
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    /// Check if this item is a folder.
    pub fn is_folder(&self) -> bool {
        self.item_type == FOLDER_TYPE
    }

    /// Child ordering stored at `extra.folder.childrenOrder`, if any.
    ///
    /// Entries that are not valid ids are skipped.
    pub fn children_order(&self) -> Option<Vec<ItemId>> {
        let order = self
            .extra
            .get(FOLDER_EXTRA_KEY)?
            .get(CHILDREN_ORDER_KEY)?
            .as_array()?;

        Some(
            order
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(|s| s.parse::<ItemId>().ok())
                .collect(),
        )
    }

    /// Replace the child ordering list, creating the containers if needed.
    pub fn set_children_order(&mut self, order: &[ItemId]) {
        let ids = order.iter().map(|id| Value::String(id.to_string())).collect();

        if !self.extra.is_object() {
            self.extra = Value::Object(Map::new());
        }
        if let Value::Object(extra) = &mut self.extra {
            let folder = extra
                .entry(FOLDER_EXTRA_KEY)
                .or_insert_with(|| Value::Object(Map::new()));
            if !folder.is_object() {
                *folder = Value::Object(Map::new());
            }
            if let Value::Object(folder) = folder {
                folder.insert(CHILDREN_ORDER_KEY.to_string(), Value::Array(ids));
            }
        }
    }

    /// Apply a partial update. `extra` and `settings` are merged key by key.
    pub fn apply_update(&mut self, patch: UpdateItemInput) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(extra) = patch.extra {
            merge_object(&mut self.extra, extra);
        }
        if let Some(settings) = patch.settings {
            merge_object(&mut self.settings, settings);
        }
        self.updated_at = Utc::now();
    }
}

/// Shallow-merge `patch` into `target`; non-object values replace.
fn merge_object(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                target.insert(key, value);
            }
        }
        (target, patch) => *target = patch,
    }
}
