//! Task runner.
//!
//! The runner is the only component that opens transactions. It executes a
//! task's plan, fans out hooks around its mutation, runs delegated
//! subtasks according to their policy, and makes sure only domain errors
//! reach the caller.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{Instrument, debug, error, info_span, warn};

use itemhub_core::config::LimitsConfig;
use itemhub_core::error::AppError;
use itemhub_core::result::AppResult;
use itemhub_database::{Transaction, TransactionManager};

use crate::hooks::{HookContext, HookManager, HookMoment, TaskHook};
use crate::operations::{self, Mutation, OperationContext, Plan};
use crate::task::{Task, TaskOutput, TaskStatus};

/// Which transaction a run uses.
pub enum TransactionScope<'a> {
    /// Open, commit or roll back a transaction of the runner's own.
    Own,
    /// Run inside a transaction owned by the caller, who decides its fate.
    Caller(&'a mut dyn Transaction),
}

/// How a delegating task runs its subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskPolicy {
    /// All subtasks share the parent's transaction. Any failure fails the
    /// parent and discards every subtask.
    Atomic,
    /// Each subtask runs in its own savepoint. If subtask `i` fails, the
    /// ones before it stay, the ones after it are not attempted, and the
    /// parent fails only when `i` is 0.
    Partial,
}

impl SubtaskPolicy {
    /// Policy matching a task's `partial_subtasks` flag.
    pub fn from_partial(partial: bool) -> Self {
        if partial { Self::Partial } else { Self::Atomic }
    }
}

/// Executes tasks against a [`TransactionManager`].
pub struct TaskRunner {
    db: Arc<dyn TransactionManager>,
    limits: LimitsConfig,
    hooks: HookManager,
}

impl TaskRunner {
    /// Create a runner with an empty hook registry.
    pub fn new(db: Arc<dyn TransactionManager>, limits: LimitsConfig) -> Self {
        Self {
            db,
            limits,
            hooks: HookManager::new(),
        }
    }

    /// Structural limits applied to every task.
    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// The runner's hook registry.
    pub fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    /// Register a handler run before the mutation of tasks named `task`.
    pub async fn set_task_pre_hook_handler(&self, task: &str, handler: Arc<dyn TaskHook>) {
        self.hooks.register(task, HookMoment::Pre, handler).await;
    }

    /// Register a handler run after the mutation of tasks named `task`.
    pub async fn set_task_post_hook_handler(&self, task: &str, handler: Arc<dyn TaskHook>) {
        self.hooks.register(task, HookMoment::Post, handler).await;
    }

    /// Remove a pre-hook handler. Returns whether it was registered.
    pub async fn unset_task_pre_hook_handler(&self, task: &str, handler: &Arc<dyn TaskHook>) -> bool {
        self.hooks.unregister(task, HookMoment::Pre, handler).await
    }

    /// Remove a post-hook handler. Returns whether it was registered.
    pub async fn unset_task_post_hook_handler(
        &self,
        task: &str,
        handler: &Arc<dyn TaskHook>,
    ) -> bool {
        self.hooks.unregister(task, HookMoment::Post, handler).await
    }

    /// Run one task in the given scope.
    pub async fn run(&self, task: &mut Task, scope: TransactionScope<'_>) -> AppResult<TaskOutput> {
        let result = match scope {
            TransactionScope::Own => self.run_in_own_transaction(task).await,
            TransactionScope::Caller(tx) => self.execute(task, tx).await,
        };
        result.map_err(sanitize)
    }

    /// Run one task, and any subtasks it delegates, in its own transaction.
    pub async fn run_single(&self, task: &mut Task) -> AppResult<TaskOutput> {
        self.run(task, TransactionScope::Own).await
    }

    /// Run each task in its own transaction. One failure never affects the
    /// others; results are indexed like `tasks`.
    pub async fn run_multiple(&self, tasks: &mut [Task]) -> Vec<AppResult<TaskOutput>> {
        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks.iter_mut() {
            results.push(self.run_single(task).await);
        }
        results
    }

    /// Run `tasks` in order in one shared transaction and return the result
    /// of the last task that ran. Any failure rolls back the whole sequence.
    pub async fn run_single_sequence(&self, tasks: &mut [Task]) -> AppResult<TaskOutput> {
        let mut tx = self.db.begin().await.map_err(sanitize)?;
        match self.execute_sequence(tasks, tx.as_mut()).await {
            Ok(output) => {
                tx.commit().await.map_err(sanitize)?;
                Ok(output)
            }
            Err(e) => {
                discard(tx).await;
                Err(sanitize(e))
            }
        }
    }

    /// [`run_single_sequence`](Self::run_single_sequence) for each sequence,
    /// independently.
    pub async fn run_multiple_sequences(
        &self,
        sequences: &mut [Vec<Task>],
    ) -> Vec<AppResult<TaskOutput>> {
        let mut results = Vec::with_capacity(sequences.len());
        for sequence in sequences.iter_mut() {
            results.push(self.run_single_sequence(sequence).await);
        }
        results
    }

    async fn run_in_own_transaction(&self, task: &mut Task) -> AppResult<TaskOutput> {
        let mut tx = self.db.begin().await?;
        match self.execute(task, tx.as_mut()).await {
            Ok(output) => {
                if let Err(e) = tx.commit().await {
                    task.set_status(TaskStatus::Fail);
                    return Err(e);
                }
                Ok(output)
            }
            Err(e) => {
                discard(tx).await;
                Err(e)
            }
        }
    }

    async fn execute_sequence(
        &self,
        tasks: &mut [Task],
        tx: &mut dyn Transaction,
    ) -> AppResult<TaskOutput> {
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(tasks.len());
        let mut last = TaskOutput::None;

        for task in tasks.iter_mut() {
            match task.resolve_input(&outputs) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(task = task.name(), "Task skipped");
                    outputs.push(TaskOutput::None);
                    continue;
                }
                Err(e) => {
                    task.set_status(TaskStatus::Fail);
                    return Err(e);
                }
            }

            let output = self.execute(task, tx).await?;
            outputs.push(output.clone());
            last = output;
        }
        Ok(last)
    }

    /// Plan and perform one task inside `tx`, recursing into subtasks.
    fn execute<'a>(
        &'a self,
        task: &'a mut Task,
        tx: &'a mut dyn Transaction,
    ) -> BoxFuture<'a, AppResult<TaskOutput>> {
        let span = info_span!(
            "task",
            task = %task.name(),
            actor = %task.actor(),
            target = ?task.target_id(),
        );

        async move {
            let Some(kind) = task.kind().cloned() else {
                task.set_status(TaskStatus::Fail);
                return Err(AppError::internal(format!(
                    "Task '{}' has no resolved input",
                    task.name()
                )));
            };
            let name = task.name().to_string();
            let ctx = OperationContext {
                actor: task.actor(),
                limits: &self.limits,
                policy: SubtaskPolicy::from_partial(task.partial_subtasks()),
            };

            task.set_status(TaskStatus::Running);
            debug!("Task running");

            let result = match operations::plan(&kind, &ctx, &mut *tx).await {
                Ok(Plan::Complete(output)) => Ok(output),
                Ok(Plan::Apply(mutation)) => self.apply_with_hooks(&name, &ctx, mutation, tx).await,
                Ok(Plan::Delegate {
                    result,
                    mut subtasks,
                    policy,
                }) => {
                    task.set_status(TaskStatus::Delegated);
                    debug!(subtasks = subtasks.len(), ?policy, "Task delegated");
                    self.run_subtasks(&mut subtasks, policy, tx)
                        .await
                        .map(|()| result)
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(output) => {
                    task.set_status(TaskStatus::Ok);
                    task.set_result(output.clone());
                    debug!("Task finished");
                    Ok(output)
                }
                Err(e) => {
                    task.set_status(TaskStatus::Fail);
                    debug!(error = %e, "Task failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .boxed()
    }

    async fn apply_with_hooks(
        &self,
        name: &str,
        ctx: &OperationContext<'_>,
        mutation: Mutation,
        tx: &mut dyn Transaction,
    ) -> AppResult<TaskOutput> {
        let subject = mutation.subject();
        let destination = mutation.destination().cloned();

        let pre = HookContext {
            task: name,
            moment: HookMoment::Pre,
            actor: ctx.actor,
            subject: &subject,
            destination: destination.as_ref(),
        };
        self.hooks.run(&pre, tx).await?;

        let output = operations::apply(mutation, ctx, tx).await?;

        let post = HookContext {
            moment: HookMoment::Post,
            subject: &output,
            ..pre
        };
        self.hooks.run(&post, tx).await?;

        Ok(output)
    }

    async fn run_subtasks(
        &self,
        subtasks: &mut [Task],
        policy: SubtaskPolicy,
        tx: &mut dyn Transaction,
    ) -> AppResult<()> {
        match policy {
            SubtaskPolicy::Atomic => {
                for subtask in subtasks.iter_mut() {
                    self.execute(subtask, tx).await?;
                }
            }
            SubtaskPolicy::Partial => {
                for (index, subtask) in subtasks.iter_mut().enumerate() {
                    let mut nested = tx.begin_nested().await?;
                    match self.execute(subtask, nested.as_mut()).await {
                        Ok(_) => nested.commit().await?,
                        Err(e) => {
                            nested.rollback().await?;
                            if index == 0 {
                                return Err(e);
                            }
                            warn!(
                                index,
                                error = %e,
                                "Subtask failed, keeping the subtasks before it"
                            );
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Pass domain errors through; log anything else and replace it with the
/// opaque unexpected error.
fn sanitize(err: AppError) -> AppError {
    if err.is_domain() {
        return err;
    }
    error!(kind = %err.kind, error = ?err, "Unexpected error while running task");
    AppError::unexpected()
}

async fn discard(tx: Box<dyn Transaction>) {
    if let Err(e) = tx.rollback().await {
        error!(error = %e, "Failed to roll back transaction");
    }
}
