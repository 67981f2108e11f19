//! Item store over the in-memory state.

use async_trait::async_trait;
use chrono::Utc;

use itemhub_core::error::AppError;
use itemhub_core::result::AppResult;
use itemhub_core::types::{ItemId, ItemPath};
use itemhub_entity::Item;

use super::MemoryTransaction;
use crate::store::ItemStore;

impl MemoryTransaction<'_> {
    fn sorted(mut items: Vec<Item>) -> Vec<Item> {
        items.sort_by(|a, b| {
            (a.depth(), a.created_at, a.id).cmp(&(b.depth(), b.created_at, b.id))
        });
        items
    }

    fn descendants_of(&self, path: &ItemPath) -> impl Iterator<Item = &Item> {
        self.working
            .items
            .values()
            .filter(move |item| path.is_ancestor_of(&item.path))
    }
}

#[async_trait]
impl<'p> ItemStore for MemoryTransaction<'p> {
    async fn get(&mut self, id: ItemId) -> AppResult<Item> {
        self.working
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::item_not_found(id))
    }

    async fn get_children(&mut self, parent: &ItemPath) -> AppResult<Vec<Item>> {
        let children = self
            .working
            .items
            .values()
            .filter(|item| item.path.parent().as_ref() == Some(parent))
            .cloned()
            .collect();
        Ok(Self::sorted(children))
    }

    async fn get_descendants(&mut self, path: &ItemPath) -> AppResult<Vec<Item>> {
        let descendants = self.descendants_of(path).cloned().collect();
        Ok(Self::sorted(descendants))
    }

    async fn get_number_of_children(&mut self, parent: &ItemPath) -> AppResult<u64> {
        let depth = parent.depth() + 1;
        Ok(self
            .descendants_of(parent)
            .filter(|item| item.depth() == depth)
            .count() as u64)
    }

    async fn get_number_of_descendants(&mut self, path: &ItemPath) -> AppResult<u64> {
        Ok(self.descendants_of(path).count() as u64)
    }

    async fn get_number_of_levels_to_farthest_child(
        &mut self,
        path: &ItemPath,
    ) -> AppResult<usize> {
        Ok(self
            .descendants_of(path)
            .map(|item| item.depth() - path.depth())
            .max()
            .unwrap_or(0))
    }

    async fn create(&mut self, item: &Item) -> AppResult<Item> {
        let duplicate = self
            .working
            .items
            .values()
            .any(|existing| existing.id == item.id || existing.path == item.path);
        if duplicate {
            return Err(AppError::database(format!(
                "Duplicate item id or path for {}",
                item.id
            )));
        }
        self.working.items.insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn update(&mut self, item: &Item) -> AppResult<Item> {
        let stored = self
            .working
            .items
            .get_mut(&item.id)
            .ok_or_else(|| AppError::item_not_found(item.id))?;
        stored.name = item.name.clone();
        stored.description = item.description.clone();
        stored.extra = item.extra.clone();
        stored.settings = item.settings.clone();
        stored.updated_at = item.updated_at;
        Ok(stored.clone())
    }

    async fn move_item(&mut self, item: &Item, new_parent: Option<&ItemPath>) -> AppResult<Item> {
        let new_path = match new_parent {
            Some(parent) => parent.child(item.id),
            None => ItemPath::root(item.id),
        };
        let old_path = &item.path;

        for stored in self.working.items.values_mut() {
            if let Some(rebased) = stored.path.rebase(old_path, &new_path) {
                stored.path = rebased;
            }
        }
        for membership in self.working.memberships.values_mut() {
            if let Some(rebased) = membership.item_path.rebase(old_path, &new_path) {
                membership.item_path = rebased;
            }
        }

        let moved = self
            .working
            .items
            .get_mut(&item.id)
            .ok_or_else(|| AppError::item_not_found(item.id))?;
        moved.updated_at = Utc::now();
        Ok(moved.clone())
    }

    async fn delete(&mut self, id: ItemId) -> AppResult<()> {
        let removed = self
            .working
            .items
            .remove(&id)
            .ok_or_else(|| AppError::item_not_found(id))?;
        self.working
            .memberships
            .retain(|_, membership| membership.item_path != removed.path);
        Ok(())
    }

    async fn delete_subtree(&mut self, path: &ItemPath) -> AppResult<u64> {
        let before = self.working.items.len();
        self.working.items.retain(|_, item| !path.contains(&item.path));
        self.working
            .memberships
            .retain(|_, membership| !path.contains(&membership.item_path));
        Ok((before - self.working.items.len()) as u64)
    }
}
