//! Structural limits for tree mutations.
//!
//! Every limit is a hard ceiling: an operation that would cross one fails
//! outright instead of degrading.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Hard ceilings consumed by the create/move/copy/delete tasks.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of levels in a tree (a root item has depth 1).
    #[serde(default = "default_max_tree_depth")]
    #[validate(range(min = 1, max = 256))]
    pub max_tree_depth: usize,
    /// Maximum number of direct children per parent.
    #[serde(default = "default_max_children")]
    #[validate(range(min = 1))]
    pub max_children: usize,
    /// Maximum descendants of an item that may be deleted at once.
    #[serde(default = "default_max_descendants")]
    pub max_descendants_for_delete: usize,
    /// Maximum descendants of an item that may be moved at once.
    #[serde(default = "default_max_descendants")]
    pub max_descendants_for_move: usize,
    /// Maximum descendants of an item that may be copied at once.
    #[serde(default = "default_max_descendants")]
    pub max_descendants_for_copy: usize,
    /// Up to this many descendants a delete runs one subtask per node.
    #[serde(default = "default_delete_subtask_threshold")]
    pub delete_subtask_threshold: usize,
    /// Maximum memberships a single membership operation may purge.
    #[serde(default = "default_max_memberships_purged")]
    pub max_memberships_purged: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tree_depth: default_max_tree_depth(),
            max_children: default_max_children(),
            max_descendants_for_delete: default_max_descendants(),
            max_descendants_for_move: default_max_descendants(),
            max_descendants_for_copy: default_max_descendants(),
            delete_subtask_threshold: default_delete_subtask_threshold(),
            max_memberships_purged: default_max_memberships_purged(),
        }
    }
}

fn default_max_tree_depth() -> usize {
    15
}

fn default_max_children() -> usize {
    50
}

fn default_max_descendants() -> usize {
    100
}

fn default_delete_subtask_threshold() -> usize {
    20
}

fn default_max_memberships_purged() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LimitsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_depth_rejected() {
        let limits = LimitsConfig {
            max_tree_depth: 0,
            ..LimitsConfig::default()
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let limits: LimitsConfig = serde_json::from_str(r#"{"max_children": 3}"#).unwrap();
        assert_eq!(limits.max_children, 3);
        assert_eq!(limits.max_tree_depth, 15);
    }
}
