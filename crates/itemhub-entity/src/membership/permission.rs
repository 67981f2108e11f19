//! Permission level enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use itemhub_core::AppError;
use itemhub_core::types::ItemId;

/// Permission level carried by a membership.
///
/// Ordered by privilege: Read < Write < Admin. The derived `Ord` follows
/// declaration order, so comparisons read naturally.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "permission_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// View the item and its subtree.
    Read,
    /// Create, edit, and copy into the item.
    Write,
    /// Share, move, and delete.
    Admin,
}

impl PermissionLevel {
    /// Check if this permission grants at least the given level.
    pub fn has_at_least(&self, required: PermissionLevel) -> bool {
        *self >= required
    }

    /// The domain error raised when `self` is required but missing on `item`.
    pub fn insufficient(&self, item: ItemId) -> AppError {
        match self {
            Self::Read => AppError::insufficient_read(item),
            Self::Write => AppError::insufficient_write(item),
            Self::Admin => AppError::insufficient_admin(item),
        }
    }

    /// Return the permission as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "admin" => Ok(Self::Admin),
            _ => Err(AppError::validation(format!(
                "Invalid permission: '{s}'. Expected one of: read, write, admin"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemhub_core::ErrorKind;

    #[test]
    fn test_privilege_ordering() {
        assert!(PermissionLevel::Read < PermissionLevel::Write);
        assert!(PermissionLevel::Write < PermissionLevel::Admin);
        assert!(PermissionLevel::Admin.has_at_least(PermissionLevel::Read));
        assert!(!PermissionLevel::Read.has_at_least(PermissionLevel::Write));
    }

    #[test]
    fn test_insufficient_error_kind() {
        let err = PermissionLevel::Write.insufficient(ItemId::new());
        assert_eq!(err.kind, ErrorKind::InsufficientPermissionWrite);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("ADMIN".parse::<PermissionLevel>().unwrap(), PermissionLevel::Admin);
        assert!("owner".parse::<PermissionLevel>().is_err());
    }
}
