//! Task interpreter.
//!
//! A task runs in two phases. [`plan`] loads what it needs, checks
//! permissions and structural limits, and decides what to do without
//! writing anything. The resulting [`Plan`] is either a finished read, a
//! single [`Mutation`] that the runner wraps in pre/post hooks and hands to
//! [`apply`], or a delegation to subtasks.

pub mod copy;
pub mod create;
pub mod delete;
pub mod item;
pub mod membership;
pub mod move_item;
pub mod permission;

use itemhub_core::config::LimitsConfig;
use itemhub_core::result::AppResult;
use itemhub_core::types::{AccountId, ItemId, MembershipId};
use itemhub_database::{MembershipFilter, Transaction};
use itemhub_entity::{Item, ItemMembership};

use crate::runner::SubtaskPolicy;
use crate::task::{Task, TaskKind, TaskOutput};

/// Inputs every operation needs besides its own parameters.
#[derive(Debug, Clone, Copy)]
pub struct OperationContext<'a> {
    /// Account the task runs for.
    pub actor: AccountId,
    /// Structural limits.
    pub limits: &'a LimitsConfig,
    /// Subtask policy requested by the task.
    pub policy: SubtaskPolicy,
}

/// Outcome of the planning phase.
#[derive(Debug)]
pub enum Plan {
    /// Read-only task, already answered.
    Complete(TaskOutput),
    /// One write, wrapped in hooks.
    Apply(Mutation),
    /// Work split into subtasks; `result` is reported once they have run.
    Delegate {
        result: TaskOutput,
        subtasks: Vec<Task>,
        policy: SubtaskPolicy,
    },
}

/// A fully validated write.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Insert an item, optionally update its parent's child ordering and
    /// insert the creator's grant.
    CreateItem {
        item: Item,
        parent: Option<Item>,
        updated_parent: Option<Item>,
        grant: Option<ItemMembership>,
    },
    /// Persist a patched item.
    UpdateItem { item: Item },
    /// Re-root an item and its subtree.
    MoveItem {
        item: Item,
        destination: Option<Item>,
    },
    /// Remove a single node.
    DeleteNode { item: Item },
    /// Remove a whole subtree in one statement.
    DeleteSubtree { item: Item },
    /// Insert a grant, replacing and purging weaker ones.
    CreateMembership {
        membership: ItemMembership,
        replace: Option<MembershipId>,
        purge: Option<MembershipFilter>,
    },
    /// Change a grant's level, purging weaker grants below.
    UpdateMembership {
        membership: ItemMembership,
        purge: Option<MembershipFilter>,
    },
    /// Remove a grant, optionally with the account's grants below.
    DeleteMembership {
        membership: ItemMembership,
        purge: Option<MembershipFilter>,
    },
}

impl Mutation {
    /// Entity handed to pre-hooks.
    pub fn subject(&self) -> TaskOutput {
        match self {
            Self::CreateItem { item, .. }
            | Self::UpdateItem { item }
            | Self::MoveItem { item, .. }
            | Self::DeleteNode { item }
            | Self::DeleteSubtree { item } => TaskOutput::Item(item.clone()),
            Self::CreateMembership { membership, .. }
            | Self::UpdateMembership { membership, .. }
            | Self::DeleteMembership { membership, .. } => {
                TaskOutput::Membership(membership.clone())
            }
        }
    }

    /// Destination parent, for hooks.
    pub fn destination(&self) -> Option<&Item> {
        match self {
            Self::CreateItem { parent, .. } => parent.as_ref(),
            Self::MoveItem { destination, .. } => destination.as_ref(),
            _ => None,
        }
    }
}

/// Validate a task and decide what it will do.
pub async fn plan(
    kind: &TaskKind,
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
) -> AppResult<Plan> {
    match kind {
        TaskKind::CreateItem { input, parent_id } => {
            create::plan(ctx, tx, input, *parent_id).await
        }
        TaskKind::GetItem { item_id } => item::plan_get(ctx, tx, *item_id).await,
        TaskKind::GetItemChildren { item_id } => item::plan_get_children(ctx, tx, *item_id).await,
        TaskKind::UpdateItem { item_id, patch } => {
            item::plan_update(ctx, tx, *item_id, patch).await
        }
        TaskKind::MoveItem { item_id, parent_id } => {
            move_item::plan(ctx, tx, *item_id, *parent_id).await
        }
        TaskKind::CopyItem { item_id, parent_id } => {
            copy::plan(ctx, tx, *item_id, *parent_id).await
        }
        TaskKind::CopyItemNode {
            item,
            grant,
            attach_to,
        } => copy::plan_node(tx, item, grant.as_ref(), *attach_to).await,
        TaskKind::DeleteItem { item_id } => delete::plan(ctx, tx, *item_id).await,
        TaskKind::DeleteItemNode { item_id } => delete::plan_node(tx, *item_id).await,
        TaskKind::CreateItemMembership {
            item_id,
            account_id,
            permission,
        } => membership::plan_create(ctx, tx, *item_id, *account_id, *permission).await,
        TaskKind::UpdateItemMembership {
            membership_id,
            permission,
        } => membership::plan_update(ctx, tx, *membership_id, *permission).await,
        TaskKind::DeleteItemMembership {
            membership_id,
            purge_below,
        } => membership::plan_delete(ctx, tx, *membership_id, *purge_below).await,
        TaskKind::GetItemMemberships { item_id } => {
            membership::plan_get_all(ctx, tx, *item_id).await
        }
    }
}

/// Perform a planned write.
pub async fn apply(
    mutation: Mutation,
    ctx: &OperationContext<'_>,
    tx: &mut dyn Transaction,
) -> AppResult<TaskOutput> {
    match mutation {
        Mutation::CreateItem {
            item,
            updated_parent,
            grant,
            ..
        } => create::apply(tx, item, updated_parent, grant).await,
        Mutation::UpdateItem { item } => item::apply_update(tx, item).await,
        Mutation::MoveItem { item, destination } => {
            move_item::apply(ctx, tx, item, destination).await
        }
        Mutation::DeleteNode { item } => delete::apply_node(tx, item).await,
        Mutation::DeleteSubtree { item } => delete::apply_subtree(tx, item).await,
        Mutation::CreateMembership {
            membership,
            replace,
            purge,
        } => membership::apply_create(tx, membership, replace, purge).await,
        Mutation::UpdateMembership { membership, purge } => {
            membership::apply_update(tx, membership, purge).await
        }
        Mutation::DeleteMembership { membership, purge } => {
            membership::apply_delete(tx, membership, purge).await
        }
    }
}

/// Take the transaction-scoped lock of every tree in `roots`, in a fixed
/// order.
pub(crate) async fn lock_trees(tx: &mut dyn Transaction, mut roots: Vec<ItemId>) -> AppResult<()> {
    roots.sort();
    roots.dedup();
    for root in roots {
        tx.lock_tree(root).await?;
    }
    Ok(())
}
