//! CLI command definitions and dispatch.

pub mod item;
pub mod membership;
pub mod migrate;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use itemhub_core::config::AppConfig;
use itemhub_core::error::AppError;
use itemhub_core::types::AccountId;
use itemhub_database::DatabasePool;
use itemhub_task::{Task, TaskKind, TaskRunner};

use crate::output::{self, OutputFormat};

/// ItemHub: hierarchical item forest with inherited memberships
#[derive(Debug, Parser)]
#[command(name = "itemhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Item management
    Item(item::ItemArgs),
    /// Membership (sharing) management
    Membership(membership::MembershipArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config).await,
            Commands::Item(args) => {
                let kind = item::to_task(&args.command);
                run_task(config, args.actor, kind, self.format).await
            }
            Commands::Membership(args) => {
                let kind = membership::to_task(&args.command)?;
                run_task(config, args.actor, kind, self.format).await
            }
        }
    }
}

/// Helper: connect to the configured database
pub async fn connect(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Run one task as `actor` in its own transaction and print the result.
async fn run_task(
    config: &AppConfig,
    actor: AccountId,
    kind: TaskKind,
    format: OutputFormat,
) -> Result<(), AppError> {
    let pool = connect(config).await?;
    let runner = TaskRunner::new(Arc::new(pool.clone()), config.limits.clone());

    let mut task = Task::new(actor, kind);
    let result = runner.run_single(&mut task).await;
    pool.close().await;

    let result = result?;
    tracing::debug!(task = task.name(), status = %task.status(), "Task completed");
    output::print_output(&result, format);
    Ok(())
}
