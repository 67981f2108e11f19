//! Unified application error types for ItemHub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Errors are split in two classes:
//! *domain* errors carry a stable code the caller can react to, while every
//! other kind is *unexpected* and never leaves the task runner verbatim.

use std::fmt;
use thiserror::Error;

/// Stable error code categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The requested item does not exist.
    ItemNotFound,
    /// The requested membership does not exist.
    MembershipNotFound,
    /// The actor lacks read permission on the item.
    InsufficientPermissionRead,
    /// The actor lacks write permission on the item.
    InsufficientPermissionWrite,
    /// The actor lacks admin permission on the item.
    InsufficientPermissionAdmin,
    /// The parent already holds the maximum number of children.
    TooManyChildren,
    /// The subtree is larger than the operation allows.
    TooManyDescendants,
    /// The operation would exceed the maximum tree depth.
    HierarchyTooDeep,
    /// The move destination is invalid (self, own subtree, or no-op).
    InvalidMoveTarget,
    /// The operation would touch more memberships than allowed.
    TooManyMemberships,
    /// The membership would be redundant or would lower inherited access.
    InvalidMembership,
    /// A membership for the same account already exists at the item.
    MembershipConflict,
    /// Input validation failed.
    Validation,
    /// A registered hook handler rejected the task.
    HookRejected,
    /// Generic opaque error returned in place of unexpected failures.
    Unexpected,
    /// An internal invariant was violated.
    Internal,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
}

impl ErrorKind {
    /// Return the stable code for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::MembershipNotFound => "MEMBERSHIP_NOT_FOUND",
            Self::InsufficientPermissionRead => "INSUFFICIENT_PERMISSION_READ",
            Self::InsufficientPermissionWrite => "INSUFFICIENT_PERMISSION_WRITE",
            Self::InsufficientPermissionAdmin => "INSUFFICIENT_PERMISSION_ADMIN",
            Self::TooManyChildren => "TOO_MANY_CHILDREN",
            Self::TooManyDescendants => "TOO_MANY_DESCENDANTS",
            Self::HierarchyTooDeep => "HIERARCHY_TOO_DEEP",
            Self::InvalidMoveTarget => "INVALID_MOVE_TARGET",
            Self::TooManyMemberships => "TOO_MANY_MEMBERSHIPS",
            Self::InvalidMembership => "INVALID_MEMBERSHIP",
            Self::MembershipConflict => "MEMBERSHIP_CONFLICT",
            Self::Validation => "VALIDATION",
            Self::HookRejected => "HOOK_REJECTED",
            Self::Unexpected => "UNEXPECTED",
            Self::Internal => "INTERNAL",
            Self::Database => "DATABASE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
        }
    }

    /// Whether errors of this kind may be handed to callers unchanged.
    ///
    /// `Unexpected` counts as domain: it is the already-sanitized stand-in.
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            Self::Internal | Self::Database | Self::Configuration | Self::Serialization
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified application error used throughout ItemHub.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error may be returned to callers unchanged.
    pub fn is_domain(&self) -> bool {
        self.kind.is_domain()
    }

    /// Create an item-not-found error.
    pub fn item_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::ItemNotFound, format!("Item {id} not found"))
    }

    /// Create a membership-not-found error.
    pub fn membership_not_found(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::MembershipNotFound,
            format!("Membership {id} not found"),
        )
    }

    /// Create an insufficient-read-permission error.
    pub fn insufficient_read(item: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InsufficientPermissionRead,
            format!("Read permission required on item {item}"),
        )
    }

    /// Create an insufficient-write-permission error.
    pub fn insufficient_write(item: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InsufficientPermissionWrite,
            format!("Write permission required on item {item}"),
        )
    }

    /// Create an insufficient-admin-permission error.
    pub fn insufficient_admin(item: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InsufficientPermissionAdmin,
            format!("Admin permission required on item {item}"),
        )
    }

    /// Create a too-many-children error.
    pub fn too_many_children(parent: impl fmt::Display, max: usize) -> Self {
        Self::new(
            ErrorKind::TooManyChildren,
            format!("Item {parent} cannot hold more than {max} children"),
        )
    }

    /// Create a too-many-descendants error.
    pub fn too_many_descendants(item: impl fmt::Display, count: u64, max: usize) -> Self {
        Self::new(
            ErrorKind::TooManyDescendants,
            format!("Item {item} has {count} descendants, the limit for this operation is {max}"),
        )
    }

    /// Create a hierarchy-too-deep error.
    pub fn hierarchy_too_deep(depth: usize, max: usize) -> Self {
        Self::new(
            ErrorKind::HierarchyTooDeep,
            format!("Resulting depth {depth} exceeds the maximum of {max}"),
        )
    }

    /// Create an invalid-move-target error.
    pub fn invalid_move_target(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidMoveTarget, message)
    }

    /// Create a too-many-memberships error.
    pub fn too_many_memberships(count: u64, max: usize) -> Self {
        Self::new(
            ErrorKind::TooManyMemberships,
            format!("Operation would remove {count} memberships, the limit is {max}"),
        )
    }

    /// Create an invalid-membership error.
    pub fn invalid_membership(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidMembership, message)
    }

    /// Create a membership-conflict error.
    pub fn membership_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MembershipConflict, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a hook-rejected error.
    pub fn hook_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HookRejected, message)
    }

    /// Create the opaque error that replaces unexpected failures.
    pub fn unexpected() -> Self {
        Self::new(ErrorKind::Unexpected, "An unexpected error occurred")
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(ErrorKind::Validation, format!("Invalid input: {err}"), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_partition() {
        assert!(ErrorKind::ItemNotFound.is_domain());
        assert!(ErrorKind::HookRejected.is_domain());
        assert!(ErrorKind::Unexpected.is_domain());
        assert!(!ErrorKind::Database.is_domain());
        assert!(!ErrorKind::Internal.is_domain());
    }

    #[test]
    fn test_display_uses_stable_code() {
        let err = AppError::too_many_children("abc", 3);
        assert!(err.to_string().starts_with("TOO_MANY_CHILDREN: "));
    }

    #[test]
    fn test_clone_drops_source() {
        let io = std::io::Error::other("disk");
        let err = AppError::with_source(ErrorKind::Database, "boom", io);
        let cloned = err.clone();
        assert_eq!(cloned.kind, ErrorKind::Database);
        assert!(cloned.source.is_none());
    }
}
