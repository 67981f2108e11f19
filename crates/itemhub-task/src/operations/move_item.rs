//! Moving an item and its subtree.

use tracing::info;

use itemhub_core::error::AppError;
use itemhub_core::result::AppResult;
use itemhub_core::types::ItemId;
use itemhub_database::{MembershipFilter, Transaction};
use itemhub_entity::{Item, PermissionLevel};

use super::create::check_room_under;
use super::permission::require;
use super::{Mutation, OperationContext, Plan, lock_trees};
use crate::task::TaskOutput;

/// Plan moving `item_id` under `parent_id`, or to root.
pub async fn plan(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    item_id: ItemId,
    parent_id: Option<ItemId>,
) -> AppResult<Plan> {
    let item = tx.items().get(item_id).await?;
    let mut roots = vec![item.path.root_id()];
    if let Some(parent_id) = parent_id {
        roots.push(tx.items().get(parent_id).await?.path.root_id());
    }
    lock_trees(tx, roots).await?;

    // Reload under the lock: a concurrent move may have changed the paths.
    let item = tx.items().get(item_id).await?;
    require(tx, ctx.actor, &item, PermissionLevel::Admin).await?;

    let destination = match parent_id {
        Some(id) => Some(tx.items().get(id).await?),
        None => None,
    };

    match &destination {
        None if item.is_root() => {
            return Err(AppError::invalid_move_target(format!(
                "Item {} is already a root item",
                item.id
            )));
        }
        None => {}
        Some(destination) => {
            if item.path.contains(&destination.path) {
                return Err(AppError::invalid_move_target(format!(
                    "Item {} cannot be moved into itself or its own subtree",
                    item.id
                )));
            }
            if item.parent_id() == Some(destination.id) {
                return Err(AppError::invalid_move_target(format!(
                    "Item {} is already a child of {}",
                    item.id, destination.id
                )));
            }

            require(tx, ctx.actor, destination, PermissionLevel::Write).await?;
            let levels = tx
                .items()
                .get_number_of_levels_to_farthest_child(&item.path)
                .await?;
            check_room_under(ctx, tx, destination, levels).await?;
        }
    }

    let descendants = tx.items().get_number_of_descendants(&item.path).await?;
    if descendants as usize > ctx.limits.max_descendants_for_move {
        return Err(AppError::too_many_descendants(
            item.id,
            descendants,
            ctx.limits.max_descendants_for_move,
        ));
    }

    Ok(Plan::Apply(Mutation::MoveItem { item, destination }))
}

/// Compute membership housekeeping, rewrite the paths, then apply the
/// housekeeping.
pub async fn apply(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    item: Item,
    destination: Option<Item>,
) -> AppResult<TaskOutput> {
    let new_parent = destination.as_ref().map(|d| &d.path);

    let housekeeping = tx
        .memberships()
        .move_housekeeping(ctx.actor, &item, new_parent)
        .await?;

    let moved = tx.items().move_item(&item, new_parent).await?;

    if !housekeeping.deletes.is_empty() {
        tx.memberships()
            .delete_many_matching(&MembershipFilter::by_ids(housekeeping.deletes.clone()))
            .await?;
    }
    if !housekeeping.inserts.is_empty() {
        tx.memberships().create_many(&housekeeping.inserts).await?;
    }

    info!(
        item_id = %moved.id,
        from = %item.path,
        to = %moved.path,
        inserted = housekeeping.inserts.len(),
        deleted = housekeeping.deletes.len(),
        "Item moved"
    );
    Ok(TaskOutput::Item(moved))
}
