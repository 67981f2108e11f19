//! # itemhub-entity
//!
//! Domain entity models for ItemHub. Every struct in this crate represents
//! a database table row or a domain value object. Database entities
//! additionally derive `sqlx::FromRow`.

pub mod item;
pub mod membership;

pub use item::{CreateItemInput, FOLDER_TYPE, Item, UpdateItemInput};
pub use membership::{ItemMembership, PermissionLevel};
