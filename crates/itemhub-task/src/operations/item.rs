//! Item reads and updates.

use tracing::info;
use validator::Validate;

use itemhub_core::result::AppResult;
use itemhub_core::types::ItemId;
use itemhub_database::Transaction;
use itemhub_entity::{Item, PermissionLevel, UpdateItemInput};

use super::permission::require;
use super::{Mutation, OperationContext, Plan};
use crate::task::TaskOutput;

/// Read one item. Requires read access.
pub async fn plan_get(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    item_id: ItemId,
) -> AppResult<Plan> {
    let item = tx.items().get(item_id).await?;
    require(tx, ctx.actor, &item, PermissionLevel::Read).await?;
    Ok(Plan::Complete(TaskOutput::Item(item)))
}

/// Read the direct children of an item, oldest first. Requires read access.
pub async fn plan_get_children(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    item_id: ItemId,
) -> AppResult<Plan> {
    let item = tx.items().get(item_id).await?;
    require(tx, ctx.actor, &item, PermissionLevel::Read).await?;
    let children = tx.items().get_children(&item.path).await?;
    Ok(Plan::Complete(TaskOutput::Items(children)))
}

/// Patch an item. Requires write access. An empty patch is answered
/// without writing.
pub async fn plan_update(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    item_id: ItemId,
    patch: &UpdateItemInput,
) -> AppResult<Plan> {
    patch.validate()?;
    let mut item = tx.items().get(item_id).await?;
    require(tx, ctx.actor, &item, PermissionLevel::Write).await?;

    if patch.is_empty() {
        return Ok(Plan::Complete(TaskOutput::Item(item)));
    }
    item.apply_update(patch.clone());
    Ok(Plan::Apply(Mutation::UpdateItem { item }))
}

/// Persist a patched item.
pub async fn apply_update(tx: &mut dyn Transaction, item: Item) -> AppResult<TaskOutput> {
    let updated = tx.items().update(&item).await?;
    info!(item_id = %updated.id, "Item updated");
    Ok(TaskOutput::Item(updated))
}
