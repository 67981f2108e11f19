//! # itemhub-task
//!
//! Every structural change to the item forest is expressed as a [`Task`]
//! and executed by a [`TaskRunner`], which owns the transactional scope,
//! the subtask policy, error normalization, and hook fan-out.

pub mod hooks;
pub mod operations;
pub mod runner;
pub mod task;

pub use hooks::{HookContext, HookManager, HookMoment, TaskHook};
pub use runner::{SubtaskPolicy, TaskRunner, TransactionScope};
pub use task::{Task, TaskKind, TaskOutput, TaskStatus};
