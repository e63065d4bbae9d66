//! Type wrappers for database keys
//!
//! Every record is addressed by a typed identifier rather than a bare `u64`,
//! so a container id can never be handed to an item lookup by accident.
//! Identifiers are stored big-endian so sled's lexicographic key order
//! matches numeric order and prefix scans (`container_items`,
//! `item_comments`, per-actor selections) come back sorted by id.
//!
//! # Types
//!
//! - **`ContainerId`**, **`ItemId`**, **`CommentId`**, **`ActorId`**: identifier newtypes
//! - **`StatKind`**: which statistic a counter tracks (items or nested items)
//! - **`CounterScope`**: own count versus subtree aggregate
//! - **`CounterKey`**: composite key of the `counters` tree
//!
//! # Examples
//!
//! ```
//! use modr::db::types::{ContainerId, CounterKey, CounterScope, StatKind};
//!
//! let key = CounterKey::new(ContainerId::new(7), CounterScope::Own, StatKind::Item);
//! assert_eq!(key.to_bytes().len(), 10);
//! assert_eq!(ContainerId::from_key(&ContainerId::new(7).to_key()).unwrap(), ContainerId::new(7));
//! ```

use super::error::DbError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Big-endian key bytes
            #[must_use]
            pub const fn to_key(self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            /// # Errors
            ///
            /// Returns `DbError::SerializeError` if `bytes` is shorter than eight bytes.
            pub fn from_key(bytes: &[u8]) -> Result<Self, DbError> {
                let raw: [u8; 8] = bytes
                    .get(..8)
                    .and_then(|b| b.try_into().ok())
                    .ok_or_else(|| {
                        DbError::SerializeError(format!("{} key must be 8 bytes", $label))
                    })?;
                Ok(Self(u64::from_be_bytes(raw)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DbError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| DbError::InvalidInput(format!("invalid {} id: '{s}'", $label)))
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(
    /// Identifier of a container (category) in the hierarchy
    ContainerId,
    "container"
);
id_type!(
    /// Identifier of a content item (discussion or redirect stub)
    ItemId,
    "item"
);
id_type!(
    /// Identifier of a nested item (comment) under a content item
    CommentId,
    "comment"
);
id_type!(
    /// Identifier of the acting user
    ActorId,
    "actor"
);

/// Statistic tracked per container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Content items directly counted (discussions)
    Item,
    /// Nested items carried by content items (comments)
    NestedItem,
}

impl StatKind {
    pub const ALL: [Self; 2] = [Self::Item, Self::NestedItem];

    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Item => 0,
            Self::NestedItem => 1,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Item => "items",
            Self::NestedItem => "nested",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a counter holds the container's own count or its subtree aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterScope {
    Own,
    Aggregate,
}

impl CounterScope {
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Own => 0,
            Self::Aggregate => 1,
        }
    }
}

/// Key of a single counter cell: container, scope, statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterKey {
    pub container: ContainerId,
    pub scope: CounterScope,
    pub kind: StatKind,
}

impl CounterKey {
    #[must_use]
    pub const fn new(container: ContainerId, scope: CounterScope, kind: StatKind) -> Self {
        Self { container, scope, kind }
    }

    #[must_use]
    pub fn to_bytes(self) -> [u8; 10] {
        let mut key = [0u8; 10];
        key[..8].copy_from_slice(&self.container.to_key());
        key[8] = self.scope.tag();
        key[9] = self.kind.tag();
        key
    }
}

/// Concatenate two ids into a 16-byte index key (`parent ++ child`)
#[must_use]
pub fn pair_key(parent: [u8; 8], child: [u8; 8]) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&parent);
    key[8..].copy_from_slice(&child);
    key
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
