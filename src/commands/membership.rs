//! Membership (sharing) CLI commands.

use clap::{Args, Subcommand};

use itemhub_core::error::AppError;
use itemhub_core::types::{AccountId, ItemId, MembershipId};
use itemhub_entity::PermissionLevel;
use itemhub_task::TaskKind;

/// Arguments for membership commands
#[derive(Debug, Args)]
pub struct MembershipArgs {
    /// Account the command acts for
    #[arg(short, long)]
    pub actor: AccountId,

    /// Membership subcommand
    #[command(subcommand)]
    pub command: MembershipCommand,
}

/// Membership subcommands
#[derive(Debug, Subcommand)]
pub enum MembershipCommand {
    /// Share an item with an account
    Share {
        /// Item ID
        item_id: ItemId,
        /// Account receiving the grant
        #[arg(short = 'u', long)]
        account: AccountId,
        /// Permission level: read, write or admin
        #[arg(short, long)]
        permission: String,
    },
    /// List the effective grant of every account at an item
    List {
        /// Item ID
        item_id: ItemId,
    },
    /// Change the level of a grant
    Update {
        /// Membership ID
        id: MembershipId,
        /// Permission level: read, write or admin
        #[arg(short, long)]
        permission: String,
    },
    /// Revoke a grant
    Remove {
        /// Membership ID
        id: MembershipId,
        /// Also remove the account's grants below the item
        #[arg(long)]
        purge_below: bool,
    },
}

/// Build the task for a membership subcommand.
pub fn to_task(command: &MembershipCommand) -> Result<TaskKind, AppError> {
    let kind = match command {
        MembershipCommand::Share {
            item_id,
            account,
            permission,
        } => TaskKind::CreateItemMembership {
            item_id: *item_id,
            account_id: *account,
            permission: permission.parse::<PermissionLevel>()?,
        },
        MembershipCommand::List { item_id } => TaskKind::GetItemMemberships { item_id: *item_id },
        MembershipCommand::Update { id, permission } => TaskKind::UpdateItemMembership {
            membership_id: *id,
            permission: permission.parse::<PermissionLevel>()?,
        },
        MembershipCommand::Remove { id, purge_below } => TaskKind::DeleteItemMembership {
            membership_id: *id,
            purge_below: *purge_below,
        },
    };
    Ok(kind)
}
