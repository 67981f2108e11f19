//! Sharing: creating, changing and revoking membership grants.

use chrono::Utc;
use tracing::info;

use itemhub_core::error::AppError;
use itemhub_core::result::AppResult;
use itemhub_core::types::{AccountId, ItemId, ItemPath, MembershipId};
use itemhub_database::inheritance::effective_grants;
use itemhub_database::{MembershipFilter, Transaction};
use itemhub_entity::{ItemMembership, PermissionLevel};

use super::permission::require;
use super::{Mutation, OperationContext, Plan};
use crate::task::TaskOutput;

/// Filter for `account`'s grants strictly below `path`, optionally only
/// those at most `at_most`.
fn grants_below(
    account: AccountId,
    path: &ItemPath,
    at_most: Option<PermissionLevel>,
) -> MembershipFilter {
    MembershipFilter {
        account_id: Some(account),
        below: Some(path.clone()),
        at_most,
        ..MembershipFilter::default()
    }
}

/// Count what `filter` would purge and enforce the purge ceiling. Returns
/// `None` when there is nothing to purge.
async fn capped_purge(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    filter: MembershipFilter,
) -> AppResult<Option<MembershipFilter>> {
    let count = tx.memberships().count_matching(&filter).await?;
    if count as usize > ctx.limits.max_memberships_purged {
        return Err(AppError::too_many_memberships(
            count,
            ctx.limits.max_memberships_purged,
        ));
    }
    Ok((count > 0).then_some(filter))
}

/// Plan granting `permission` on `item_id` to `account_id`.
///
/// The account's inherited grant must be weaker than the requested one. A
/// weaker grant at the same item is replaced, and weaker grants further
/// down are purged.
pub async fn plan_create(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    item_id: ItemId,
    account_id: AccountId,
    permission: PermissionLevel,
) -> AppResult<Plan> {
    let item = tx.items().get(item_id).await?;
    require(tx, ctx.actor, &item, PermissionLevel::Admin).await?;

    let inherited = tx.memberships().get_inherited(account_id, &item.path).await?;
    let mut replace = None;
    if let Some(existing) = inherited {
        if existing.permission >= permission {
            return Err(AppError::invalid_membership(format!(
                "Account {account_id} already holds {} on item {}",
                existing.permission, item.id
            )));
        }
        if existing.is_at(&item.path) {
            replace = Some(existing.id);
        }
    }

    let purge = capped_purge(
        ctx,
        tx,
        grants_below(account_id, &item.path, Some(permission)),
    )
    .await?;

    let membership = ItemMembership::new(item.path.clone(), account_id, permission, ctx.actor);
    Ok(Plan::Apply(Mutation::CreateMembership {
        membership,
        replace,
        purge,
    }))
}

/// Plan changing a grant to `permission`.
///
/// The new level must exceed what the account inherits from above the
/// grant's item.
pub async fn plan_update(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    membership_id: MembershipId,
    permission: PermissionLevel,
) -> AppResult<Plan> {
    let membership = tx.memberships().get(membership_id).await?;
    let item = tx.items().get(membership.item_path.id()).await?;
    require(tx, ctx.actor, &item, PermissionLevel::Admin).await?;

    if let Some(parent) = item.parent_path() {
        let from_above = tx
            .memberships()
            .get_inherited(membership.account_id, &parent)
            .await?;
        if let Some(above) = from_above {
            if above.permission >= permission {
                return Err(AppError::invalid_membership(format!(
                    "Account {} already inherits {} on item {}",
                    membership.account_id, above.permission, item.id
                )));
            }
        }
    }

    let purge = capped_purge(
        ctx,
        tx,
        grants_below(membership.account_id, &item.path, Some(permission)),
    )
    .await?;

    let mut updated = membership;
    updated.permission = permission;
    updated.updated_at = Utc::now();
    Ok(Plan::Apply(Mutation::UpdateMembership {
        membership: updated,
        purge,
    }))
}

/// Plan revoking a grant, with the account's grants below it when
/// `purge_below` is set.
pub async fn plan_delete(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    membership_id: MembershipId,
    purge_below: bool,
) -> AppResult<Plan> {
    let membership = tx.memberships().get(membership_id).await?;
    let item = tx.items().get(membership.item_path.id()).await?;
    require(tx, ctx.actor, &item, PermissionLevel::Admin).await?;

    let purge = if purge_below {
        capped_purge(ctx, tx, grants_below(membership.account_id, &item.path, None)).await?
    } else {
        None
    };

    Ok(Plan::Apply(Mutation::DeleteMembership { membership, purge }))
}

/// Effective grant per account at `item_id`. Requires read access.
pub async fn plan_get_all(
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
    item_id: ItemId,
) -> AppResult<Plan> {
    let item = tx.items().get(item_id).await?;
    require(tx, ctx.actor, &item, PermissionLevel::Read).await?;

    let chain = tx
        .memberships()
        .get_at_paths(&item.path.ancestors_or_self())
        .await?;
    Ok(Plan::Complete(TaskOutput::Memberships(effective_grants(
        &item.path, &chain,
    ))))
}

async fn purge(tx: &mut dyn Transaction, filter: Option<MembershipFilter>) -> AppResult<u64> {
    match filter {
        Some(filter) => tx.memberships().delete_many_matching(&filter).await,
        None => Ok(0),
    }
}

/// Insert a grant after removing the grants it supersedes.
pub async fn apply_create(
    tx: &mut dyn Transaction,
    membership: ItemMembership,
    replace: Option<MembershipId>,
    purge_filter: Option<MembershipFilter>,
) -> AppResult<TaskOutput> {
    if let Some(replaced) = replace {
        tx.memberships()
            .delete_many_matching(&MembershipFilter::by_ids(vec![replaced]))
            .await?;
    }
    let purged = purge(tx, purge_filter).await?;

    let mut created = tx.memberships().create_many(&[membership]).await?;
    let created = created
        .pop()
        .ok_or_else(|| AppError::internal("Membership insert returned no row"))?;

    info!(
        membership_id = %created.id,
        account_id = %created.account_id,
        path = %created.item_path,
        permission = %created.permission,
        purged,
        "Membership created"
    );
    Ok(TaskOutput::Membership(created))
}

/// Change a grant's level after removing the grants it supersedes.
pub async fn apply_update(
    tx: &mut dyn Transaction,
    membership: ItemMembership,
    purge_filter: Option<MembershipFilter>,
) -> AppResult<TaskOutput> {
    let purged = purge(tx, purge_filter).await?;
    let updated = tx
        .memberships()
        .update_permission(membership.id, membership.permission)
        .await?;

    info!(
        membership_id = %updated.id,
        permission = %updated.permission,
        purged,
        "Membership updated"
    );
    Ok(TaskOutput::Membership(updated))
}

/// Remove a grant and, optionally, the account's grants below it.
pub async fn apply_delete(
    tx: &mut dyn Transaction,
    membership: ItemMembership,
    purge_filter: Option<MembershipFilter>,
) -> AppResult<TaskOutput> {
    let purged = purge(tx, purge_filter).await?;
    tx.memberships()
        .delete_many_matching(&MembershipFilter::by_ids(vec![membership.id]))
        .await?;

    info!(membership_id = %membership.id, purged, "Membership deleted");
    Ok(TaskOutput::Membership(membership))
}
