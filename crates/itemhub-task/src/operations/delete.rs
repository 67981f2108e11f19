//! Deleting an item and its subtree.

use tracing::info;

use itemhub_core::error::AppError;
use itemhub_core::result::AppResult;
use itemhub_core::types::ItemId;
use itemhub_database::Transaction;
use itemhub_entity::{Item, PermissionLevel};

use super::permission::require;
use super::{Mutation, OperationContext, Plan, lock_trees};
use crate::task::{Task, TaskKind, TaskOutput};

/// Plan deleting `item_id` with its subtree.
///
/// Small subtrees are removed node by node, deepest first and the item
/// itself last, so per-node hooks fire. Larger ones go in one statement.
pub async fn plan(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    item_id: ItemId,
) -> AppResult<Plan> {
    let item = tx.items().get(item_id).await?;
    lock_trees(tx, vec![item.path.root_id()]).await?;

    let item = tx.items().get(item_id).await?;
    require(tx, ctx.actor, &item, PermissionLevel::Admin).await?;

    let count = tx.items().get_number_of_descendants(&item.path).await?;
    if count as usize > ctx.limits.max_descendants_for_delete {
        return Err(AppError::too_many_descendants(
            item.id,
            count,
            ctx.limits.max_descendants_for_delete,
        ));
    }

    if count as usize > ctx.limits.delete_subtask_threshold {
        return Ok(Plan::Apply(Mutation::DeleteSubtree { item }));
    }

    let descendants = tx.items().get_descendants(&item.path).await?;
    let subtasks = descendants
        .iter()
        .rev()
        .chain(std::iter::once(&item))
        .map(|node| Task::new(ctx.actor, TaskKind::DeleteItemNode { item_id: node.id }))
        .collect();

    Ok(Plan::Delegate {
        result: TaskOutput::Item(item),
        subtasks,
        policy: ctx.policy,
    })
}

/// Plan removing one node of a delete.
pub async fn plan_node(tx: &mut dyn Transaction, item_id: ItemId) -> AppResult<Plan> {
    let item = tx.items().get(item_id).await?;
    Ok(Plan::Apply(Mutation::DeleteNode { item }))
}

/// Remove one node.
pub async fn apply_node(tx: &mut dyn Transaction, item: Item) -> AppResult<TaskOutput> {
    tx.items().delete(item.id).await?;
    info!(item_id = %item.id, path = %item.path, "Item deleted");
    Ok(TaskOutput::Item(item))
}

/// Remove a whole subtree.
pub async fn apply_subtree(tx: &mut dyn Transaction, item: Item) -> AppResult<TaskOutput> {
    let removed = tx.items().delete_subtree(&item.path).await?;
    info!(item_id = %item.id, path = %item.path, removed, "Item subtree deleted");
    Ok(TaskOutput::Item(item))
}
