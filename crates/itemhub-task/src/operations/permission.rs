//! Inherited permission checks.

use itemhub_core::result::AppResult;
use itemhub_core::types::{AccountId, ItemPath};
use itemhub_database::Transaction;
use itemhub_entity::{Item, PermissionLevel};

/// Level `actor` inherits at `path`, if any.
pub async fn permission_at(
    tx: &mut dyn Transaction,
    actor: AccountId,
    path: &ItemPath,
) -> AppResult<Option<PermissionLevel>> {
    let grant = tx.memberships().get_inherited(actor, path).await?;
    Ok(grant.map(|g| g.permission))
}

/// Require `actor` to hold at least `required` over `item`, returning the
/// level actually held.
pub async fn require(
    tx: &mut dyn Transaction,
    actor: AccountId,
    item: &Item,
    required: PermissionLevel,
) -> AppResult<PermissionLevel> {
    match permission_at(tx, actor, &item.path).await? {
        Some(held) if held.has_at_least(required) => Ok(held),
        _ => Err(required.insufficient(item.id)),
    }
}
