//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use itemhub_entity::{Item, ItemMembership};
use itemhub_task::TaskOutput;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Item display row
#[derive(Debug, Serialize, Tabled)]
struct ItemRow {
    id: String,
    name: String,
    #[tabled(rename = "type")]
    item_type: String,
    depth: usize,
    parent: String,
    creator: String,
    updated_at: String,
}

impl From<&Item> for ItemRow {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            item_type: item.item_type.clone(),
            depth: item.depth(),
            parent: item
                .parent_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            creator: item.creator.to_string(),
            updated_at: item.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Membership display row
#[derive(Debug, Serialize, Tabled)]
struct MembershipRow {
    id: String,
    item: String,
    account: String,
    permission: String,
    creator: String,
}

impl From<&ItemMembership> for MembershipRow {
    fn from(membership: &ItemMembership) -> Self {
        Self {
            id: membership.id.to_string(),
            item: membership.item_path.id().to_string(),
            account: membership.account_id.to_string(),
            permission: membership.permission.to_string(),
            creator: membership.creator.to_string(),
        }
    }
}

/// Print a list of rows in the selected format
fn print_list<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json => print_json(rows),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    println!("{json}");
}

/// Print a task result. JSON output carries the full entities.
pub fn print_output(output: &TaskOutput, format: OutputFormat) {
    match (output, format) {
        (TaskOutput::None, _) => print_success("Nothing to report."),
        (TaskOutput::Item(item), OutputFormat::Json) => print_json(item),
        (TaskOutput::Items(items), OutputFormat::Json) => print_json(items),
        (TaskOutput::Membership(membership), OutputFormat::Json) => print_json(membership),
        (TaskOutput::Memberships(memberships), OutputFormat::Json) => print_json(memberships),
        (TaskOutput::Item(item), OutputFormat::Table) => {
            print_list(&[ItemRow::from(item)], format)
        }
        (TaskOutput::Items(items), OutputFormat::Table) => {
            let rows: Vec<ItemRow> = items.iter().map(ItemRow::from).collect();
            print_list(&rows, format);
        }
        (TaskOutput::Membership(membership), OutputFormat::Table) => {
            print_list(&[MembershipRow::from(membership)], format)
        }
        (TaskOutput::Memberships(memberships), OutputFormat::Table) => {
            let rows: Vec<MembershipRow> = memberships.iter().map(MembershipRow::from).collect();
            print_list(&rows, format);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}
