//! Copying an item and its subtree.
//!
//! The copy is planned in full up front: every node gets a fresh id and
//! path, and each clone is inserted by its own subtask, parents first.
//! A clone joins its parent's child ordering only when it is inserted, so
//! a partially applied copy never lists children it does not have.

use std::collections::HashMap;

use itemhub_core::error::AppError;
use itemhub_core::result::AppResult;
use itemhub_core::types::{AccountId, ItemId, ItemPath};
use itemhub_database::Transaction;
use itemhub_entity::{Item, ItemMembership, PermissionLevel};

use super::create::{check_room_under, creator_grant, with_child_appended};
use super::permission::require;
use super::{Mutation, OperationContext, Plan, lock_trees};
use crate::task::{Task, TaskKind, TaskOutput};

/// Plan copying `item_id` under `parent_id`, or to root.
pub async fn plan(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    item_id: ItemId,
    parent_id: Option<ItemId>,
) -> AppResult<Plan> {
    let source = tx.items().get(item_id).await?;
    let mut roots = vec![source.path.root_id()];
    if let Some(parent_id) = parent_id {
        roots.push(tx.items().get(parent_id).await?.path.root_id());
    }
    lock_trees(tx, roots).await?;

    let source = tx.items().get(item_id).await?;
    require(tx, ctx.actor, &source, PermissionLevel::Read).await?;
    let descendants = tx.items().get_descendants(&source.path).await?;

    let (destination, held) = match parent_id {
        Some(id) => {
            let destination = tx.items().get(id).await?;
            let held = require(tx, ctx.actor, &destination, PermissionLevel::Write).await?;
            let levels = tx
                .items()
                .get_number_of_levels_to_farthest_child(&source.path)
                .await?;
            check_room_under(ctx, tx, &destination, levels).await?;
            (Some(destination), Some(held))
        }
        None => (None, None),
    };

    if descendants.len() > ctx.limits.max_descendants_for_copy {
        return Err(AppError::too_many_descendants(
            source.id,
            descendants.len() as u64,
            ctx.limits.max_descendants_for_copy,
        ));
    }

    let clones = clone_tree(
        &source,
        &descendants,
        destination.as_ref().map(|d| &d.path),
        ctx.actor,
    )?;
    let root_clone = clones
        .first()
        .cloned()
        .ok_or_else(|| AppError::internal("Copy produced no nodes"))?;
    let grant = creator_grant(ctx.actor, &root_clone, held);

    let subtasks = clones
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let is_root = index == 0;
            let attach_to = if is_root { parent_id } else { item.parent_id() };
            Task::new(
                ctx.actor,
                TaskKind::CopyItemNode {
                    item,
                    grant: if is_root { grant.clone() } else { None },
                    attach_to,
                },
            )
        })
        .collect();

    Ok(Plan::Delegate {
        result: TaskOutput::Item(root_clone),
        subtasks,
        policy: ctx.policy,
    })
}

/// Plan inserting one prepared clone, appending it to its parent's child
/// ordering when the parent keeps one.
pub async fn plan_node(
    tx: &mut dyn Transaction,
    item: &Item,
    grant: Option<&ItemMembership>,
    attach_to: Option<ItemId>,
) -> AppResult<Plan> {
    let parent = match attach_to {
        Some(id) => Some(tx.items().get(id).await?),
        None => None,
    };
    let updated_parent = parent
        .as_ref()
        .and_then(|p| with_child_appended(p, item.id));

    Ok(Plan::Apply(Mutation::CreateItem {
        item: item.clone(),
        parent,
        updated_parent,
        grant: grant.cloned(),
    }))
}

/// Clone `source` and its `descendants` under `destination`.
///
/// The result starts with the copy root and lists every parent before its
/// children. Siblings follow the source's child ordering: listed children
/// first, then unlisted ones in creation order. A clone whose source keeps
/// an ordering starts with an empty one; each child is appended as it is
/// inserted.
pub fn clone_tree(
    source: &Item,
    descendants: &[Item],
    destination: Option<&ItemPath>,
    actor: AccountId,
) -> AppResult<Vec<Item>> {
    let id_map: HashMap<ItemId, ItemId> = std::iter::once(source)
        .chain(descendants)
        .map(|n| (n.id, ItemId::new()))
        .collect();
    let by_id: HashMap<ItemId, &Item> = descendants.iter().map(|n| (n.id, n)).collect();

    let prefix: Vec<ItemId> = destination
        .map(|d| d.ids().to_vec())
        .unwrap_or_default();
    let offset = source.depth() - 1;

    let mut children_of: HashMap<ItemId, Vec<ItemId>> = HashMap::new();
    for node in descendants {
        if let Some(parent) = node.parent_id() {
            children_of.entry(parent).or_default().push(node.id);
        }
    }

    let mut clones = Vec::with_capacity(id_map.len());
    let mut pending = vec![source];
    while let Some(node) = pending.pop() {
        let mut ids = prefix.clone();
        for old in &node.path.ids()[offset..] {
            let new = id_map
                .get(old)
                .ok_or_else(|| AppError::internal(format!("Item {old} is outside the copied tree")))?;
            ids.push(*new);
        }
        let mut clone = node.duplicate(ItemPath::from_ids(ids)?, actor);

        let children = children_of.get(&node.id).map(Vec::as_slice).unwrap_or(&[]);
        let ordered = match node.children_order() {
            Some(order) => {
                clone.set_children_order(&[]);
                ordered_children(&order, children)
            }
            None => children.to_vec(),
        };
        clones.push(clone);

        pending.extend(ordered.iter().rev().filter_map(|id| by_id.get(id).copied()));
    }
    Ok(clones)
}

/// Direct children in the order given by `order`, followed by the ones it
/// does not mention. Entries that are not direct children are dropped.
fn ordered_children(order: &[ItemId], children: &[ItemId]) -> Vec<ItemId> {
    let mut ordered: Vec<ItemId> = Vec::with_capacity(children.len());
    for id in order.iter().chain(children) {
        if children.contains(id) && !ordered.contains(id) {
            ordered.push(*id);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemhub_entity::{CreateItemInput, FOLDER_TYPE};

    fn node(parent: Option<&Item>) -> Item {
        named("n", parent)
    }

    fn named(name: &str, parent: Option<&Item>) -> Item {
        Item::new(
            CreateItemInput::new(name, FOLDER_TYPE),
            AccountId::new(),
            parent.map(|p| &p.path),
        )
    }

    #[test]
    fn test_clone_tree_preserves_structure() {
        let outer = node(None);
        let source = node(Some(&outer));
        let child = node(Some(&source));
        let grandchild = node(Some(&child));
        let destination = ItemPath::root(ItemId::new());

        let clones = clone_tree(
            &source,
            &[child.clone(), grandchild.clone()],
            Some(&destination),
            AccountId::new(),
        )
        .unwrap();

        assert_eq!(clones.len(), 3);
        assert_eq!(clones[0].parent_path(), Some(destination.clone()));
        assert_eq!(clones[1].parent_id(), Some(clones[0].id));
        assert_eq!(clones[2].parent_id(), Some(clones[1].id));
        assert_eq!(clones[2].depth(), 4);
        assert!(clones.iter().all(|c| c.id != source.id && c.id != child.id));
    }

    #[test]
    fn test_siblings_follow_source_order() {
        let mut source = named("src", None);
        let a = named("a", Some(&source));
        let b = named("b", Some(&source));
        let c = named("c", Some(&source));
        let b_child = named("b1", Some(&b));
        let stranger = ItemId::new();
        source.set_children_order(&[b.id, stranger, a.id]);

        let clones = clone_tree(
            &source,
            &[a.clone(), b.clone(), c.clone(), b_child],
            None,
            AccountId::new(),
        )
        .unwrap();
        let names: Vec<&str> = clones.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["src", "b", "b1", "a", "c"]);
        assert_eq!(clones[0].children_order(), Some(vec![]));
        assert_eq!(clones[2].parent_id(), Some(clones[1].id));
        assert!(clones[0].is_root());
    }

    #[test]
    fn test_items_without_order_keep_none() {
        let source = node(None);
        let child = node(Some(&source));
        let clones = clone_tree(&source, &[child], None, AccountId::new()).unwrap();
        assert!(clones[0].children_order().is_none());
    }
}
