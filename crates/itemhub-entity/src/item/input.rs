//! Caller-supplied item data for create and update tasks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Data required to create a new item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemInput {
    /// Display name.
    #[validate(length(min = 1, max = 500))]
    pub name: String,
    /// Item type.
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100))]
    pub item_type: String,
    /// Optional description.
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// Type-specific payload (defaults to `{}`).
    #[serde(default)]
    pub extra: Option<Value>,
    /// Settings (defaults to `{}`).
    #[serde(default)]
    pub settings: Option<Value>,
}

impl CreateItemInput {
    /// Minimal input with a name and a type.
    pub fn new(name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item_type: item_type.into(),
            description: None,
            extra: None,
            settings: None,
        }
    }

    /// Set the `extra` payload.
    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Partial update of an item. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemInput {
    /// New display name.
    #[validate(length(min = 1, max = 500))]
    pub name: Option<String>,
    /// New description.
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// Keys merged into `extra`.
    pub extra: Option<Value>,
    /// Keys merged into `settings`.
    pub settings: Option<Value>,
}

impl UpdateItemInput {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.extra.is_none()
            && self.settings.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        let input = CreateItemInput::new("", "folder");
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_valid_input() {
        let input = CreateItemInput::new("reports", "document");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_update_patch_emptiness() {
        assert!(UpdateItemInput::default().is_empty());
        let patch = UpdateItemInput {
            name: Some("x".into()),
            ..UpdateItemInput::default()
        };
        assert!(!patch.is_empty());
        assert!(patch.validate().is_ok());
    }
}
