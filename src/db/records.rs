//! Persisted record shapes and the item schema
//!
//! Records are serialized with bincode's serde integration, which lets the
//! `chrono` timestamps ride along without hand-written `Encode` impls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::error::DbError;
use super::types::{CommentId, ContainerId, ItemId};

/// A node in the container hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: ContainerId,
    pub name: String,
    /// Absent for root containers
    pub parent: Option<ContainerId>,
    /// Most recently active item in this container's subtree
    pub last_item: Option<ItemId>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// What a content item is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Discussion,
    /// Placeholder left behind when a discussion is moved
    Redirect,
}

/// Markup format of an item body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Text,
    Markdown,
    Html,
}

/// A content item owned by one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub container: ContainerId,
    pub kind: ItemKind,
    pub title: String,
    pub body: String,
    pub format: BodyFormat,
    /// Closed items accept no further nested items or edits
    pub closed: bool,
    /// Number of nested items (comments); the delta unit when the item moves
    pub nested_count: u64,
    pub inserted_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// Fields for creating a content item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub container: ContainerId,
    pub kind: ItemKind,
    pub title: String,
    pub body: String,
    pub format: BodyFormat,
    pub closed: bool,
    /// Defaults to now when absent
    pub inserted_at: Option<DateTime<Utc>>,
}

impl NewItem {
    /// A plain-text discussion with no explicit timestamp
    #[must_use]
    pub fn discussion(container: ContainerId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            container,
            kind: ItemKind::Discussion,
            title: title.into(),
            body: body.into(),
            format: BodyFormat::Text,
            closed: false,
            inserted_at: None,
        }
    }
}

/// A nested item (comment) under a content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub item: ItemId,
    pub body: String,
    pub inserted_at: DateTime<Utc>,
}

/// Field limits enforced by `create_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSchema {
    /// Maximum title length in characters
    pub max_title_length: usize,
    /// Maximum body length in characters
    pub max_body_length: usize,
}

impl Default for ItemSchema {
    fn default() -> Self {
        Self {
            max_title_length: 100,
            max_body_length: 65_535,
        }
    }
}

impl ItemSchema {
    /// Collect every schema violation of `item`
    #[must_use]
    pub fn violations(&self, item: &NewItem) -> Vec<String> {
        let mut problems = Vec::new();
        let title_len = item.title.chars().count();
        if item.title.trim().is_empty() {
            problems.push("title is required".to_string());
        } else if title_len > self.max_title_length {
            problems.push(format!(
                "title is {title_len} characters, maximum is {}",
                self.max_title_length
            ));
        }
        let body_len = item.body.chars().count();
        if body_len > self.max_body_length {
            problems.push(format!(
                "body is {body_len} characters, maximum is {}",
                self.max_body_length
            ));
        }
        problems
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, DbError> {
    Ok(bincode::serde::encode_to_vec(value, bincode::config::standard())?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DbError> {
    let (value, _): (T, usize) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(value)
}
