//! Materialized-path codec.
//!
//! An [`ItemPath`] is the ordered chain of ancestor ids of an item,
//! including the item itself as the last segment. It is only turned into a
//! delimited string at the storage boundary: segments are joined with `.`
//! and each hyphenated UUID has its `-` rewritten to `_`, which keeps the
//! encoded form inside the `[0-9a-f_.]` alphabet. Since ids are UUIDs,
//! neither `.` nor `_` can occur in a raw id, so the rewrite is lossless.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::id::ItemId;
use crate::error::AppError;

/// Separator between encoded segments.
pub const PATH_SEPARATOR: char = '.';

const ID_DASH: char = '-';
const SEGMENT_DASH: char = '_';

/// Ancestry of an item, root first and the item itself last. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemPath(Vec<ItemId>);

impl ItemPath {
    /// Path of a root item.
    pub fn root(id: ItemId) -> Self {
        Self(vec![id])
    }

    /// Build a path from an explicit id chain.
    pub fn from_ids(ids: Vec<ItemId>) -> Result<Self, AppError> {
        if ids.is_empty() {
            return Err(AppError::validation("An item path needs at least one segment"));
        }
        Ok(Self(ids))
    }

    /// Path of a new child `id` directly under this path.
    pub fn child(&self, id: ItemId) -> Self {
        let mut ids = self.0.clone();
        ids.push(id);
        Self(ids)
    }

    /// The id chain, root first.
    pub fn ids(&self) -> &[ItemId] {
        &self.0
    }

    /// Id of the item this path belongs to.
    pub fn id(&self) -> ItemId {
        self.0[self.0.len() - 1]
    }

    /// Id of the tree root.
    pub fn root_id(&self) -> ItemId {
        self.0[0]
    }

    /// Number of segments. A root item has depth 1.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the path of a root item.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Path with the last segment removed, or `None` at root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Strict ancestors, root first.
    pub fn ancestors(&self) -> Vec<Self> {
        (1..self.0.len()).map(|n| Self(self.0[..n].to_vec())).collect()
    }

    /// Strict ancestors followed by this path.
    pub fn ancestors_or_self(&self) -> Vec<Self> {
        (1..=self.0.len())
            .map(|n| Self(self.0[..n].to_vec()))
            .collect()
    }

    /// Whether `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &ItemPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// Whether `other` is this path or lies below it.
    pub fn contains(&self, other: &ItemPath) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Replace the `from` prefix with `to`. Returns `None` if `from` is not
    /// a prefix of this path.
    pub fn rebase(&self, from: &ItemPath, to: &ItemPath) -> Option<Self> {
        if !from.contains(self) {
            return None;
        }
        let mut ids = to.0.clone();
        ids.extend_from_slice(&self.0[from.0.len()..]);
        Some(Self(ids))
    }

    /// Serialize to the storage representation.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|id| id_to_segment(*id))
            .collect::<Vec<_>>()
            .join(&PATH_SEPARATOR.to_string())
    }

    /// Parse the storage representation.
    pub fn decode(encoded: &str) -> Result<Self, AppError> {
        let ids = encoded
            .split(PATH_SEPARATOR)
            .map(path_to_id)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_ids(ids)
    }
}

/// Encode a single id as a path segment.
pub fn id_to_segment(id: ItemId) -> String {
    id.0.hyphenated()
        .to_string()
        .replace(ID_DASH, &SEGMENT_DASH.to_string())
}

/// Decode a single path segment back into an id.
pub fn path_to_id(segment: &str) -> Result<ItemId, AppError> {
    if segment.contains(ID_DASH) {
        return Err(AppError::validation(format!(
            "Path segment '{segment}' is not in storage form"
        )));
    }
    let raw = segment.replace(SEGMENT_DASH, &ID_DASH.to_string());
    Uuid::parse_str(&raw)
        .map(ItemId)
        .map_err(|e| AppError::validation(format!("Invalid path segment '{segment}': {e}")))
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ItemPath {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for ItemPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for ItemPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::decode(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::Postgres> for ItemPath {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "sqlx")]
impl<'q> sqlx::Encode<'q, sqlx::Postgres> for ItemPath {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.encode(), buf)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ItemPath {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(ItemPath::decode(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> ItemPath {
        let mut path = ItemPath::root(ItemId::new());
        for _ in 1..n {
            path = path.child(ItemId::new());
        }
        path
    }

    #[test]
    fn test_depth_matches_decoded_length() {
        let path = chain(4);
        let decoded = ItemPath::decode(&path.encode()).unwrap();
        assert_eq!(path.depth(), 4);
        assert_eq!(decoded.ids().len(), path.depth());
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_segment_encoding_is_storage_safe() {
        let id = ItemId::new();
        let segment = id_to_segment(id);
        assert!(!segment.contains('-'));
        assert!(!segment.contains(PATH_SEPARATOR));
        assert_eq!(path_to_id(&segment).unwrap(), id);
    }

    #[test]
    fn test_decode_rejects_raw_uuid_and_garbage() {
        let raw = ItemId::new().to_string();
        assert!(path_to_id(&raw).is_err());
        assert!(ItemPath::decode("not_a_path").is_err());
        assert!(ItemPath::decode("").is_err());
    }

    #[test]
    fn test_parent_and_root() {
        let root = ItemPath::root(ItemId::new());
        assert!(root.parent().is_none());
        let child = root.child(ItemId::new());
        assert_eq!(child.parent(), Some(root.clone()));
        assert_eq!(child.root_id(), root.id());
    }

    #[test]
    fn test_ancestry_relations() {
        let path = chain(3);
        let parent = path.parent().unwrap();
        assert!(parent.is_ancestor_of(&path));
        assert!(!path.is_ancestor_of(&path));
        assert!(path.contains(&path));
        assert_eq!(path.ancestors().len(), 2);
        assert_eq!(path.ancestors_or_self().last(), Some(&path));
    }

    #[test]
    fn test_rebase() {
        let old_parent = ItemPath::root(ItemId::new());
        let item = old_parent.child(ItemId::new());
        let leaf = item.child(ItemId::new());
        let new_parent = chain(2);
        let new_item = item.rebase(&old_parent, &new_parent).unwrap();
        assert_eq!(new_item.parent(), Some(new_parent.clone()));
        let new_leaf = leaf.rebase(&item, &new_item).unwrap();
        assert_eq!(new_leaf.depth(), 4);
        assert!(new_parent.rebase(&item, &new_item).is_none());
    }

    #[test]
    fn test_serde_uses_storage_form() {
        let path = chain(2);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, format!("\"{}\"", path.encode()));
        let back: ItemPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
