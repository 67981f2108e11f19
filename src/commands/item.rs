//! Item management CLI commands.

use clap::{Args, Subcommand};
use serde_json::Value;

use itemhub_core::types::{AccountId, ItemId};
use itemhub_entity::{CreateItemInput, FOLDER_TYPE, UpdateItemInput};
use itemhub_task::TaskKind;

/// Arguments for item commands
#[derive(Debug, Args)]
pub struct ItemArgs {
    /// Account the command acts for
    #[arg(short, long)]
    pub actor: AccountId,

    /// Item subcommand
    #[command(subcommand)]
    pub command: ItemCommand,
}

/// Item subcommands
#[derive(Debug, Subcommand)]
pub enum ItemCommand {
    /// Create a new item
    Create {
        /// Item name
        #[arg(short, long)]
        name: String,
        /// Item type
        #[arg(short = 't', long = "type", default_value = FOLDER_TYPE)]
        item_type: String,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
        /// Type-specific payload as a JSON object
        #[arg(long, value_parser = parse_json)]
        extra: Option<Value>,
        /// Parent item ID (omit for root)
        #[arg(short, long)]
        parent_id: Option<ItemId>,
    },
    /// Show one item
    Get {
        /// Item ID
        id: ItemId,
    },
    /// List the direct children of an item
    Children {
        /// Item ID
        id: ItemId,
    },
    /// Rename or describe an item
    Update {
        /// Item ID
        id: ItemId,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        /// Keys merged into the item's settings, as a JSON object
        #[arg(long, value_parser = parse_json)]
        settings: Option<Value>,
    },
    /// Move an item and its subtree
    Move {
        /// Item ID
        id: ItemId,
        /// New parent item ID (omit to move to root)
        #[arg(short, long)]
        parent_id: Option<ItemId>,
    },
    /// Copy an item and its subtree
    Copy {
        /// Item ID
        id: ItemId,
        /// Destination parent item ID (omit to copy to root)
        #[arg(short, long)]
        parent_id: Option<ItemId>,
    },
    /// Delete an item and its subtree
    Delete {
        /// Item ID
        id: ItemId,
    },
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("Invalid JSON: {e}"))
}

/// Build the task for an item subcommand.
pub fn to_task(command: &ItemCommand) -> TaskKind {
    match command {
        ItemCommand::Create {
            name,
            item_type,
            description,
            extra,
            parent_id,
        } => TaskKind::CreateItem {
            input: CreateItemInput {
                name: name.clone(),
                item_type: item_type.clone(),
                description: description.clone(),
                extra: extra.clone(),
                settings: None,
            },
            parent_id: *parent_id,
        },
        ItemCommand::Get { id } => TaskKind::GetItem { item_id: *id },
        ItemCommand::Children { id } => TaskKind::GetItemChildren { item_id: *id },
        ItemCommand::Update {
            id,
            name,
            description,
            settings,
        } => TaskKind::UpdateItem {
            item_id: *id,
            patch: UpdateItemInput {
                name: name.clone(),
                description: description.clone(),
                extra: None,
                settings: settings.clone(),
            },
        },
        ItemCommand::Move { id, parent_id } => TaskKind::MoveItem {
            item_id: *id,
            parent_id: *parent_id,
        },
        ItemCommand::Copy { id, parent_id } => TaskKind::CopyItem {
            item_id: *id,
            parent_id: *parent_id,
        },
        ItemCommand::Delete { id } => TaskKind::DeleteItem { item_id: *id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::commands::{Cli, Commands};

    fn parse(args: &[&str]) -> ItemArgs {
        match Cli::parse_from(args).command {
            Commands::Item(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_create_defaults_to_folder_at_root() {
        let actor = AccountId::new();
        let actor_arg = actor.to_string();
        let args = parse(&["itemhub", "item", "--actor", &actor_arg, "create", "-n", "docs"]);

        assert_eq!(args.actor, actor);
        match to_task(&args.command) {
            TaskKind::CreateItem { input, parent_id } => {
                assert_eq!(input.item_type, FOLDER_TYPE);
                assert_eq!(input.name, "docs");
                assert!(parent_id.is_none());
            }
            other => panic!("unexpected task {other:?}"),
        }
    }

    #[test]
    fn test_move_to_parent() {
        let item = ItemId::new();
        let parent = ItemId::new();
        let actor_arg = AccountId::new().to_string();
        let item_arg = item.to_string();
        let parent_arg = parent.to_string();
        let args = parse(&[
            "itemhub", "item", "-a", &actor_arg, "move", &item_arg, "-p", &parent_arg,
        ]);

        assert_eq!(
            to_task(&args.command),
            TaskKind::MoveItem {
                item_id: item,
                parent_id: Some(parent),
            }
        );
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let actor_arg = AccountId::new().to_string();
        let result = Cli::try_parse_from([
            "itemhub", "item", "-a", &actor_arg, "create", "-n", "x", "--extra", "{oops",
        ]);
        assert!(result.is_err());
    }
}
