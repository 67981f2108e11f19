//! Hook moments and the context handed to hook handlers.

use serde::{Deserialize, Serialize};
use std::fmt;

use itemhub_core::types::AccountId;
use itemhub_entity::Item;

use crate::task::TaskOutput;

/// When a hook fires relative to the task's mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookMoment {
    /// Before the mutation is applied. A failure aborts the task.
    Pre,
    /// After the mutation is applied, inside the same transaction. A
    /// failure also aborts the task.
    Post,
}

impl fmt::Display for HookMoment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pre => f.write_str("pre"),
            Self::Post => f.write_str("post"),
        }
    }
}

/// Data available to a hook handler.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// Name of the running task.
    pub task: &'a str,
    /// Pre or post.
    pub moment: HookMoment,
    /// Account the task runs for.
    pub actor: AccountId,
    /// Pre: the entity about to be written. Post: the task result.
    pub subject: &'a TaskOutput,
    /// Destination parent of a move, copy or create, if any.
    pub destination: Option<&'a Item>,
}
