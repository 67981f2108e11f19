//! Task struct.

use std::fmt;

use uuid::Uuid;

use itemhub_core::result::AppResult;
use itemhub_core::types::AccountId;

use super::kind::TaskKind;
use super::output::TaskOutput;
use super::status::TaskStatus;

/// Builds a task's input from the results of earlier tasks in the same
/// sequence. Returning `Ok(None)` skips the task.
pub type InputResolver =
    Box<dyn FnOnce(&[TaskOutput]) -> AppResult<Option<TaskKind>> + Send + 'static>;

/// A unit of work bound to an actor.
///
/// Tasks are built by callers and handed to the
/// [`TaskRunner`](crate::TaskRunner); they are never executed directly.
pub struct Task {
    name: String,
    actor: AccountId,
    target_id: Option<Uuid>,
    status: TaskStatus,
    result: Option<TaskOutput>,
    partial_subtasks: Option<bool>,
    skip: bool,
    kind: Option<TaskKind>,
    resolver: Option<InputResolver>,
}

impl Task {
    /// Create a task from a fully known input.
    pub fn new(actor: AccountId, kind: TaskKind) -> Self {
        Self {
            name: kind.name().to_string(),
            actor,
            target_id: kind.target_id(),
            status: TaskStatus::New,
            result: None,
            partial_subtasks: None,
            skip: false,
            kind: Some(kind),
            resolver: None,
        }
    }

    /// Create a task whose input is produced, inside a sequence, from the
    /// results of the tasks before it.
    pub fn deferred(
        name: impl Into<String>,
        actor: AccountId,
        resolver: impl FnOnce(&[TaskOutput]) -> AppResult<Option<TaskKind>> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            actor,
            target_id: None,
            status: TaskStatus::New,
            result: None,
            partial_subtasks: None,
            skip: false,
            kind: None,
            resolver: Some(Box::new(resolver)),
        }
    }

    /// Choose between per-subtask savepoints (`true`) and all-or-nothing
    /// subtasks (`false`). Without a choice the task kind decides.
    pub fn with_partial_subtasks(mut self, partial: bool) -> Self {
        self.partial_subtasks = Some(partial);
        self
    }

    /// Mark the task to be skipped when it runs as part of a sequence.
    pub fn with_skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    /// Task name, used for logging and hook lookup.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Account on whose behalf the task runs.
    pub fn actor(&self) -> AccountId {
        self.actor
    }

    /// Id of the entity the task acts on.
    pub fn target_id(&self) -> Option<Uuid> {
        self.target_id
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Result of a successful run.
    pub fn result(&self) -> Option<&TaskOutput> {
        self.result.as_ref()
    }

    /// Whether subtasks run in their own savepoints.
    pub fn partial_subtasks(&self) -> bool {
        self.partial_subtasks.unwrap_or_else(|| {
            self.kind
                .as_ref()
                .is_some_and(TaskKind::default_partial_subtasks)
        })
    }

    /// Whether the task is marked to be skipped.
    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    /// The task input, once known.
    pub fn kind(&self) -> Option<&TaskKind> {
        self.kind.as_ref()
    }

    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub(crate) fn set_result(&mut self, result: TaskOutput) {
        self.result = Some(result);
    }

    /// Run the input resolver, if any. Returns `false` when the task must
    /// be skipped.
    pub(crate) fn resolve_input(&mut self, previous: &[TaskOutput]) -> AppResult<bool> {
        if self.skip {
            return Ok(false);
        }
        if let Some(resolver) = self.resolver.take() {
            match resolver(previous)? {
                Some(kind) => {
                    self.target_id = kind.target_id();
                    self.kind = Some(kind);
                }
                None => {
                    self.skip = true;
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("actor", &self.actor)
            .field("target_id", &self.target_id)
            .field("status", &self.status)
            .field("partial_subtasks", &self.partial_subtasks())
            .field("skip", &self.skip)
            .field("kind", &self.kind)
            .field("deferred", &self.resolver.is_some())
            .finish()
    }
}
