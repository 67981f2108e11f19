//! Item creation.

use tracing::info;
use validator::Validate;

use itemhub_core::error::AppError;
use itemhub_core::result::AppResult;
use itemhub_core::types::{AccountId, ItemId};
use itemhub_database::Transaction;
use itemhub_entity::{CreateItemInput, Item, ItemMembership, PermissionLevel};

use super::permission::permission_at;
use super::{Mutation, OperationContext, Plan};
use crate::task::TaskOutput;

/// Check that `parent` can take one more child holding `levels` levels
/// below it.
pub(crate) async fn check_room_under(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    parent: &Item,
    levels: usize,
) -> AppResult<()> {
    let depth = parent.depth() + 1 + levels;
    if depth > ctx.limits.max_tree_depth {
        return Err(AppError::hierarchy_too_deep(depth, ctx.limits.max_tree_depth));
    }

    let children = tx.items().get_number_of_children(&parent.path).await?;
    if children as usize + 1 > ctx.limits.max_children {
        return Err(AppError::too_many_children(parent.id, ctx.limits.max_children));
    }
    Ok(())
}

/// `parent` with `child` appended to its child ordering, when it is a
/// folder that keeps one.
pub(crate) fn with_child_appended(parent: &Item, child: ItemId) -> Option<Item> {
    if !parent.is_folder() {
        return None;
    }
    let mut order = parent.children_order()?;
    order.push(child);
    let mut updated = parent.clone();
    updated.set_children_order(&order);
    Some(updated)
}

/// Admin grant for `actor` at `item`, unless `held` at the parent already
/// gives them write access over it.
pub(crate) fn creator_grant(
    actor: AccountId,
    item: &Item,
    held: Option<PermissionLevel>,
) -> Option<ItemMembership> {
    if held.is_some_and(|p| p.has_at_least(PermissionLevel::Write)) {
        return None;
    }
    Some(ItemMembership::new(
        item.path.clone(),
        actor,
        PermissionLevel::Admin,
        actor,
    ))
}

/// Plan the creation of an item under `parent_id`, or as a root.
pub async fn plan(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    input: &CreateItemInput,
    parent_id: Option<ItemId>,
) -> AppResult<Plan> {
    input.validate()?;

    let (parent, held) = match parent_id {
        Some(id) => {
            let parent = tx.items().get(id).await?;
            let held = permission_at(tx, ctx.actor, &parent.path).await?;
            if !held.is_some_and(|p| p.has_at_least(PermissionLevel::Write)) {
                return Err(AppError::insufficient_write(parent.id));
            }
            check_room_under(ctx, tx, &parent, 0).await?;
            (Some(parent), held)
        }
        None => (None, None),
    };

    let item = Item::new(input.clone(), ctx.actor, parent.as_ref().map(|p| &p.path));
    let grant = creator_grant(ctx.actor, &item, held);
    let updated_parent = parent
        .as_ref()
        .and_then(|p| with_child_appended(p, item.id));

    Ok(Plan::Apply(Mutation::CreateItem {
        item,
        parent,
        updated_parent,
        grant,
    }))
}

/// Insert the item, then the parent's new ordering and the grant.
pub async fn apply(
    tx: &mut dyn Transaction,
    item: Item,
    updated_parent: Option<Item>,
    grant: Option<ItemMembership>,
) -> AppResult<TaskOutput> {
    let created = tx.items().create(&item).await?;
    if let Some(parent) = updated_parent {
        tx.items().update(&parent).await?;
    }
    if let Some(grant) = grant {
        tx.memberships().create_many(&[grant]).await?;
    }

    info!(item_id = %created.id, path = %created.path, creator = %created.creator, "Item created");
    Ok(TaskOutput::Item(created))
}
