//! Task lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a task: `New → Running → Ok | Fail | Delegated`.
///
/// A delegated task reaches `Ok` once its subtasks have run according to
/// its subtask policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Not started yet.
    New,
    /// Executing.
    Running,
    /// Finished successfully.
    Ok,
    /// Finished with an error.
    Fail,
    /// Waiting on its subtasks.
    Delegated,
}

impl TaskStatus {
    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Running => "RUNNING",
            Self::Ok => "OK",
            Self::Fail => "FAIL",
            Self::Delegated => "DELEGATED",
        }
    }

    /// Whether the task has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ok | Self::Fail)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
