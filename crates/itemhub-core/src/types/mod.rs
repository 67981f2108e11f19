//! Core type definitions used across the ItemHub workspace.

pub mod id;
pub mod path;

pub use id::*;
pub use path::ItemPath;
