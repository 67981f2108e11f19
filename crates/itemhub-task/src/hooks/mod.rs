//! Pre/post hooks around task mutations.

pub mod definitions;
pub mod manager;

pub use definitions::{HookContext, HookMoment};
pub use manager::{HookManager, TaskHook};
