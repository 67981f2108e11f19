//! Item membership (permission grant) domain entities.

pub mod model;
pub mod permission;

pub use model::ItemMembership;
pub use permission::PermissionLevel;
