//! Selection keys of the form `<Kind>_<id>`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::SelectionError;
use crate::db::{CommentId, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyKind {
    Discussion,
    Comment,
}

impl KeyKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Discussion => "Discussion",
            Self::Comment => "Comment",
        }
    }
}

/// A checked entry in a selection set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectionKey {
    pub kind: KeyKind,
    pub id: u64,
}

impl SelectionKey {
    #[must_use]
    pub const fn discussion(id: ItemId) -> Self {
        Self {
            kind: KeyKind::Discussion,
            id: id.get(),
        }
    }

    #[must_use]
    pub const fn comment(id: CommentId) -> Self {
        Self {
            kind: KeyKind::Comment,
            id: id.get(),
        }
    }

    #[must_use]
    pub const fn item_id(self) -> Option<ItemId> {
        match self.kind {
            KeyKind::Discussion => Some(ItemId::new(self.id)),
            KeyKind::Comment => None,
        }
    }

    #[must_use]
    pub const fn comment_id(self) -> Option<CommentId> {
        match self.kind {
            KeyKind::Comment => Some(CommentId::new(self.id)),
            KeyKind::Discussion => None,
        }
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.id)
    }
}

impl FromStr for SelectionKey {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || SelectionError::MalformedKey(s.to_string());
        let (prefix, id) = s.split_once('_').ok_or_else(malformed)?;
        let kind = match prefix {
            "Discussion" => KeyKind::Discussion,
            "Comment" => KeyKind::Comment,
            _ => return Err(malformed()),
        };
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let id = id.parse().map_err(|_| malformed())?;
        Ok(Self { kind, id })
    }
}

impl Serialize for SelectionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SelectionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_keys() {
        let key: SelectionKey = "Comment_7".parse().unwrap();
        assert_eq!(key.kind, KeyKind::Comment);
        assert_eq!(key.comment_id(), Some(CommentId::new(7)));
        assert_eq!(key.item_id(), None);

        let key: SelectionKey = "Discussion_12".parse().unwrap();
        assert_eq!(key, SelectionKey::discussion(ItemId::new(12)));
        assert_eq!(key.to_string(), "Discussion_12");
    }

    #[test]
    fn test_parse_malformed_keys() {
        for raw in ["", "Comment", "Comment_", "comment_7", "Comment_-1", "Comment_7x", "Thread_3", "_3"] {
            assert!(
                matches!(raw.parse::<SelectionKey>(), Err(SelectionError::MalformedKey(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_json_form_is_string() {
        let key = SelectionKey::comment(CommentId::new(3));
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"Comment_3\"");
        let back: SelectionKey = serde_json::from_str("\"Comment_3\"").unwrap();
        assert_eq!(back, key);
    }
}
