//! Per-actor selection sets
//!
//! An actor checks discussions (global scope) or comments within one
//! discussion (parent scope) ahead of a bulk action. Each `(actor, scope)`
//! pair is one entry in the `selections` tree holding an ordered list of
//! keys. An entry whose list would become empty is removed instead of being
//! stored empty, so "nothing selected" always reads back as absent.
//!
//! Key layout: `actor (8 bytes BE) | scope tag (1 byte) | parent id (8 bytes BE, parent scope only)`.
//!
//! Authorization is not checked here; callers decide whether the actor may
//! act on what they selected.

pub mod error;
pub mod key;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::{ActorId, Database, ItemId};

pub use error::SelectionError;
pub use key::{KeyKind, SelectionKey};

const GLOBAL_TAG: u8 = 0;
const PARENT_TAG: u8 = 1;

/// Where a selection lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Checked discussions
    Global,
    /// Checked comments inside one discussion
    Parent(ItemId),
}

impl Scope {
    fn storage_key(self, actor: ActorId) -> Vec<u8> {
        let mut key = actor.to_key().to_vec();
        match self {
            Self::Global => key.push(GLOBAL_TAG),
            Self::Parent(item) => {
                key.push(PARENT_TAG);
                key.extend_from_slice(&item.to_key());
            }
        }
        key
    }

    fn from_storage_key(key: &[u8]) -> Option<Self> {
        match key.get(8)? {
            &GLOBAL_TAG => Some(Self::Global),
            &PARENT_TAG => ItemId::from_key(key.get(9..)?).ok().map(Self::Parent),
            _ => None,
        }
    }
}

/// One entry of a toggle request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckToggle {
    pub check_id: String,
    pub checked: bool,
}

/// How much an actor currently has selected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSummary {
    pub discussions: usize,
    /// `(discussion, number of selected comments)` in discussion id order
    pub comments: Vec<(ItemId, usize)>,
}

impl SelectionSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.discussions == 0 && self.comments.is_empty()
    }
}

/// Selection sets persisted in the database
pub struct SelectionStore<'a> {
    db: &'a Database,
}

impl<'a> SelectionStore<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn load(&self, key: &[u8]) -> Result<Vec<SelectionKey>, SelectionError> {
        let raw = self.db.selection(key)?.unwrap_or_default();
        Ok(raw
            .iter()
            .filter_map(|entry| match entry.parse() {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!("Dropping stored selection entry: {e}");
                    None
                }
            })
            .collect())
    }

    fn store(&self, key: &[u8], entries: &[SelectionKey]) -> Result<(), SelectionError> {
        if entries.is_empty() {
            self.db.remove_selection(key)?;
        } else {
            let raw: Vec<String> = entries.iter().map(ToString::to_string).collect();
            self.db.put_selection(key, &raw)?;
        }
        Ok(())
    }

    /// Check or uncheck one key; returns the number of keys left in the scope
    ///
    /// # Errors
    /// Returns `SelectionError::Db` if the entry cannot be read or written.
    pub fn toggle(
        &self,
        actor: ActorId,
        scope: Scope,
        key: SelectionKey,
        checked: bool,
    ) -> Result<usize, SelectionError> {
        let storage_key = scope.storage_key(actor);
        let mut entries = self.load(&storage_key)?;
        apply_toggle(&mut entries, key, checked);
        self.store(&storage_key, &entries)?;
        debug!(%actor, ?scope, %key, checked, "Toggled selection");
        Ok(entries.len())
    }

    /// Apply a toggle request in order and persist once
    ///
    /// Every `checkId` is parsed before anything is written, so a malformed
    /// request leaves the stored set untouched.
    ///
    /// # Errors
    /// Returns `SelectionError::MalformedKey` for a bad `checkId`.
    pub fn toggle_many(
        &self,
        actor: ActorId,
        scope: Scope,
        toggles: &[CheckToggle],
    ) -> Result<usize, SelectionError> {
        let parsed = toggles
            .iter()
            .map(|t| Ok((t.check_id.parse::<SelectionKey>()?, t.checked)))
            .collect::<Result<Vec<_>, SelectionError>>()?;

        let storage_key = scope.storage_key(actor);
        let mut entries = self.load(&storage_key)?;
        for (key, checked) in parsed {
            apply_toggle(&mut entries, key, checked);
        }
        self.store(&storage_key, &entries)?;
        debug!(%actor, ?scope, toggles = toggles.len(), selected = entries.len(), "Applied toggle request");
        Ok(entries.len())
    }

    /// Keys selected in `scope`, in check order; empty if none
    ///
    /// # Errors
    /// Returns `SelectionError::Db` if the entry cannot be read.
    pub fn get(&self, actor: ActorId, scope: Scope) -> Result<Vec<SelectionKey>, SelectionError> {
        self.load(&scope.storage_key(actor))
    }

    /// Remove the whole scope entry; `true` if one existed
    ///
    /// # Errors
    /// Returns `SelectionError::Db` if the removal fails.
    pub fn clear(&self, actor: ActorId, scope: Scope) -> Result<bool, SelectionError> {
        Ok(self.db.remove_selection(&scope.storage_key(actor))?)
    }

    /// Remove every scope of `actor`; returns the number of entries removed
    ///
    /// # Errors
    /// Returns `SelectionError::Db` if the scan or a removal fails.
    pub fn clear_all(&self, actor: ActorId) -> Result<usize, SelectionError> {
        let mut removed = 0;
        for (key, _) in self.db.scan_selections(&actor.to_key())? {
            if self.db.remove_selection(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Drop specific keys from a scope, leaving the rest selected
    ///
    /// # Errors
    /// Returns `SelectionError::Db` if the entry cannot be read or written.
    pub fn remove_keys(
        &self,
        actor: ActorId,
        scope: Scope,
        keys: &[SelectionKey],
    ) -> Result<(), SelectionError> {
        let storage_key = scope.storage_key(actor);
        let mut entries = self.load(&storage_key)?;
        entries.retain(|entry| !keys.contains(entry));
        self.store(&storage_key, &entries)
    }

    /// Count what `actor` has selected across all scopes
    ///
    /// # Errors
    /// Returns `SelectionError::Db` if the scan fails.
    pub fn summary(&self, actor: ActorId) -> Result<SelectionSummary, SelectionError> {
        let mut summary = SelectionSummary::default();
        for (key, entries) in self.db.scan_selections(&actor.to_key())? {
            match Scope::from_storage_key(&key) {
                Some(Scope::Global) => summary.discussions = entries.len(),
                Some(Scope::Parent(item)) => summary.comments.push((item, entries.len())),
                None => warn!(%actor, "Skipping selection entry with unknown scope"),
            }
        }
        Ok(summary)
    }
}

fn apply_toggle(entries: &mut Vec<SelectionKey>, key: SelectionKey, checked: bool) {
    if checked {
        if !entries.contains(&key) {
            entries.push(key);
        }
    } else {
        entries.retain(|entry| *entry != key);
    }
}
