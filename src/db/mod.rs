//! Database wrapper module for modr
//!
//! Provides the record store behind the moderation engine using sled as the
//! embedded database backend.
//!
//! Uses multiple sled trees for efficient indexing:
//! - `containers`: container id -> `ContainerRecord`
//! - `items`: item id -> `ItemRecord`
//! - `container_items`: (container, item) -> () reverse index for counting
//! - `comments`: comment id -> `CommentRecord`
//! - `item_comments`: (item, comment) -> () reverse index
//! - `counters`: (container, scope, kind) -> big-endian `u64`
//! - `selections`: (actor, scope) -> ordered list of selection keys

use chrono::{DateTime, Utc};
use sled::{Db, Tree};
use std::collections::HashSet;
use std::path::Path;

pub mod error;
pub mod records;
pub mod traits;
pub mod types;

pub use error::DbError;
pub use records::{BodyFormat, CommentRecord, ContainerRecord, ItemKind, ItemRecord, ItemSchema, NewItem};
pub use traits::{ActivityCache, ItemStore};
pub use types::{ActorId, CommentId, ContainerId, CounterKey, CounterScope, ItemId, StatKind};

use records::{decode, encode};
use types::pair_key;

/// Value stored in the pure index trees
const EMPTY: &[u8] = &[];

/// Result of an atomic counter update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterUpdate {
    /// Stored value after the update
    pub value: u64,
    /// The raw result would have been negative and was floored at zero
    pub clamped: bool,
}

/// Database wrapper that encapsulates all storage operations
pub struct Database {
    db: Db,
    containers: Tree,
    items: Tree,
    container_items: Tree,
    comments: Tree,
    item_comments: Tree,
    counters: Tree,
    selections: Tree,
    schema: ItemSchema,
}

impl Database {
    /// Opens or creates a database at the specified path with the default item schema
    ///
    /// # Examples
    /// ```no_run
    /// use modr::db::Database;
    /// let db = Database::open("my_forum").unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the database cannot be opened or if the internal trees cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Self::open_with_schema(path, ItemSchema::default())
    }

    /// Opens or creates a database enforcing the given item schema
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the database cannot be opened or if the internal trees cannot be created.
    pub fn open_with_schema<P: AsRef<Path>>(path: P, schema: ItemSchema) -> Result<Self, DbError> {
        let db = sled::open(path)?;
        let containers = db.open_tree("containers")?;
        let items = db.open_tree("items")?;
        let container_items = db.open_tree("container_items")?;
        let comments = db.open_tree("comments")?;
        let item_comments = db.open_tree("item_comments")?;
        let counters = db.open_tree("counters")?;
        let selections = db.open_tree("selections")?;
        Ok(Self {
            db,
            containers,
            items,
            container_items,
            comments,
            item_comments,
            counters,
            selections,
            schema,
        })
    }

    fn next_id(&self) -> Result<u64, DbError> {
        // sled ids start at zero; keep zero free so it never looks like a default
        Ok(self.db.generate_id()? + 1)
    }

    // Containers

    /// Create a container under `parent` (or a new root when `None`)
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` if `parent` does not exist, or `DbError` on storage failures.
    pub fn create_container(&self, name: &str, parent: Option<ContainerId>) -> Result<ContainerId, DbError> {
        if name.trim().is_empty() {
            return Err(DbError::InvalidInput("container name is required".into()));
        }
        if let Some(parent) = parent {
            if !self.containers.contains_key(parent.to_key())? {
                return Err(DbError::NotFound(format!("container {parent}")));
            }
        }
        let id = ContainerId::new(self.next_id()?);
        let record = ContainerRecord {
            id,
            name: name.trim().to_string(),
            parent,
            last_item: None,
            last_activity_at: None,
        };
        self.put_container(&record)?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the lookup or decoding fails.
    pub fn get_container(&self, id: ContainerId) -> Result<Option<ContainerRecord>, DbError> {
        match self.containers.get(id.to_key())? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    /// All containers in id order
    ///
    /// # Errors
    ///
    /// Returns `DbError` if iteration or decoding fails.
    pub fn list_containers(&self) -> Result<Vec<ContainerRecord>, DbError> {
        let mut records = Vec::new();
        for result in &self.containers {
            let (_, value) = result?;
            records.push(decode(&value)?);
        }
        Ok(records)
    }

    /// Direct children of `id`
    ///
    /// # Errors
    ///
    /// Returns `DbError` if iteration or decoding fails.
    pub fn children(&self, id: ContainerId) -> Result<Vec<ContainerRecord>, DbError> {
        Ok(self
            .list_containers()?
            .into_iter()
            .filter(|c| c.parent == Some(id))
            .collect())
    }

    fn put_container(&self, record: &ContainerRecord) -> Result<(), DbError> {
        self.containers.insert(record.id.to_key(), encode(record)?)?;
        Ok(())
    }

    // Items

    /// Items directly owned by `container`, in id order
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the index scan or decoding fails.
    pub fn list_items(&self, container: ContainerId) -> Result<Vec<ItemRecord>, DbError> {
        let mut records = Vec::new();
        for result in self.container_items.scan_prefix(container.to_key()) {
            let (key, _) = result?;
            let item = ItemId::from_key(&key[8..])?;
            if let Some(record) = self.get_item(item)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn put_item(&self, record: &ItemRecord) -> Result<(), DbError> {
        self.items.insert(record.id.to_key(), encode(record)?)?;
        Ok(())
    }

    /// Total number of items across all containers
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    // Comments

    /// Add a nested item under `item`, bumping its `nested_count` and activity time
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` if the item does not exist,
    /// `DbError::ValidationError` if it is closed, or `DbError` on storage failures.
    pub fn add_comment(&self, item: ItemId, body: &str) -> Result<CommentId, DbError> {
        let mut record = self
            .get_item(item)?
            .ok_or_else(|| DbError::NotFound(format!("item {item}")))?;
        if record.closed {
            return Err(DbError::ValidationError(format!("item {item} is closed")));
        }
        let id = CommentId::new(self.next_id()?);
        let now = Utc::now();
        let comment = CommentRecord {
            id,
            item,
            body: body.to_string(),
            inserted_at: now,
        };
        self.comments.insert(id.to_key(), encode(&comment)?)?;
        self.item_comments.insert(pair_key(item.to_key(), id.to_key()), EMPTY)?;
        record.nested_count += 1;
        record.last_activity_at = now;
        self.put_item(&record)?;
        Ok(id)
    }

    /// Nested items under `item`, in id order
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the index scan or decoding fails.
    pub fn list_comments(&self, item: ItemId) -> Result<Vec<CommentRecord>, DbError> {
        let mut records = Vec::new();
        for result in self.item_comments.scan_prefix(item.to_key()) {
            let (key, _) = result?;
            if let Some(comment) = self.get_comment(CommentId::from_key(&key[8..])?)? {
                records.push(comment);
            }
        }
        Ok(records)
    }

    // Counters

    /// Current value of a counter cell (zero if never written)
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the lookup fails.
    pub fn counter(&self, key: CounterKey) -> Result<u64, DbError> {
        Ok(self
            .counters
            .get(key.to_bytes())?
            .map_or(0, |value| decode_counter(&value)))
    }

    /// Atomically add `delta` to a counter cell, flooring the result at zero
    ///
    /// Backed by sled's compare-and-swap loop, so concurrent batches touching
    /// the same cell never lose an update.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub(crate) fn add_to_counter(&self, key: CounterKey, delta: i64) -> Result<CounterUpdate, DbError> {
        let mut clamped = false;
        let updated = self.counters.update_and_fetch(key.to_bytes(), |old| {
            let current = old.map_or(0, decode_counter);
            let next = i128::from(current) + i128::from(delta);
            clamped = next < 0;
            let stored = u64::try_from(next.max(0)).unwrap_or(u64::MAX);
            Some(stored.to_be_bytes().to_vec())
        })?;
        Ok(CounterUpdate {
            value: updated.map_or(0, |value| decode_counter(&value)),
            clamped,
        })
    }

    /// Overwrite a counter cell
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the write fails.
    pub(crate) fn set_counter(&self, key: CounterKey, value: u64) -> Result<(), DbError> {
        self.counters.insert(key.to_bytes(), value.to_be_bytes().to_vec())?;
        Ok(())
    }

    // Selections (raw; the selection module owns the key layout)

    /// # Errors
    ///
    /// Returns `DbError` if the lookup or decoding fails.
    pub fn selection(&self, key: &[u8]) -> Result<Option<Vec<String>>, DbError> {
        match self.selections.get(key)? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns `DbError` if encoding or the write fails.
    pub fn put_selection(&self, key: &[u8], entries: &[String]) -> Result<(), DbError> {
        self.selections.insert(key, encode(&entries)?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the removal fails.
    pub fn remove_selection(&self, key: &[u8]) -> Result<bool, DbError> {
        Ok(self.selections.remove(key)?.is_some())
    }

    /// All selection entries whose key starts with `prefix`
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the scan or decoding fails.
    pub fn scan_selections(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<String>)>, DbError> {
        let mut entries = Vec::new();
        for result in self.selections.scan_prefix(prefix) {
            let (key, value) = result?;
            entries.push((key.to_vec(), decode(&value)?));
        }
        Ok(entries)
    }

    // Maintenance

    /// Item schema enforced by `create_item`
    #[must_use]
    pub const fn item_schema(&self) -> ItemSchema {
        self.schema
    }

    /// Flush all pending writes to disk
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the flush operation fails.
    pub fn flush(&self) -> Result<(), DbError> {
        self.db.flush()?;
        Ok(())
    }

    /// Clear all records from the database
    ///
    /// # Warning
    /// This operation is irreversible!
    ///
    /// # Errors
    ///
    /// Returns `DbError` if clearing any tree fails.
    pub fn clear(&self) -> Result<(), DbError> {
        for tree in [
            &self.containers,
            &self.items,
            &self.container_items,
            &self.comments,
            &self.item_comments,
            &self.counters,
            &self.selections,
        ] {
            tree.clear()?;
        }
        Ok(())
    }
}

fn decode_counter(bytes: &[u8]) -> u64 {
    bytes
        .get(..8)
        .and_then(|b| <[u8; 8]>::try_from(b).ok())
        .map_or(0, u64::from_be_bytes)
}

impl ItemStore for Database {
    fn get_item(&self, id: ItemId) -> Result<Option<ItemRecord>, DbError> {
        match self.items.get(id.to_key())? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    fn count_items(&self, container: ContainerId) -> Result<u64, DbError> {
        let mut count = 0;
        for result in self.container_items.scan_prefix(container.to_key()) {
            result?;
            count += 1;
        }
        Ok(count)
    }

    fn count_nested(&self, container: ContainerId) -> Result<u64, DbError> {
        Ok(self.list_items(container)?.iter().map(|i| i.nested_count).sum())
    }

    fn set_container(&self, item: ItemId, container: ContainerId) -> Result<(), DbError> {
        let mut record = self
            .get_item(item)?
            .ok_or_else(|| DbError::NotFound(format!("item {item}")))?;
        if !self.containers.contains_key(container.to_key())? {
            return Err(DbError::NotFound(format!("container {container}")));
        }
        self.container_items
            .remove(pair_key(record.container.to_key(), item.to_key()))?;
        record.container = container;
        self.put_item(&record)?;
        self.container_items
            .insert(pair_key(container.to_key(), item.to_key()), EMPTY)?;
        Ok(())
    }

    fn delete_item(&self, item: ItemId) -> Result<bool, DbError> {
        let Some(record) = self.get_item(item)? else {
            return Ok(false);
        };
        for result in self.item_comments.scan_prefix(item.to_key()) {
            let (key, _) = result?;
            self.comments.remove(&key[8..])?;
            self.item_comments.remove(key)?;
        }
        self.container_items
            .remove(pair_key(record.container.to_key(), item.to_key()))?;
        Ok(self.items.remove(item.to_key())?.is_some())
    }

    fn create_item(&self, item: NewItem) -> Result<ItemId, DbError> {
        let mut problems = self.schema.violations(&item);
        if !self.containers.contains_key(item.container.to_key())? {
            problems.push(format!("container {} does not exist", item.container));
        }
        if !problems.is_empty() {
            return Err(DbError::ValidationError(problems.join("; ")));
        }
        let id = ItemId::new(self.next_id()?);
        let inserted_at: DateTime<Utc> = item.inserted_at.unwrap_or_else(Utc::now);
        let record = ItemRecord {
            id,
            container: item.container,
            kind: item.kind,
            title: item.title,
            body: item.body,
            format: item.format,
            closed: item.closed,
            nested_count: 0,
            inserted_at,
            last_activity_at: inserted_at,
        };
        self.put_item(&record)?;
        self.container_items
            .insert(pair_key(record.container.to_key(), id.to_key()), EMPTY)?;
        Ok(id)
    }

    fn get_comment(&self, id: CommentId) -> Result<Option<CommentRecord>, DbError> {
        match self.comments.get(id.to_key())? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    fn delete_comment(&self, id: CommentId) -> Result<bool, DbError> {
        let Some(comment) = self.get_comment(id)? else {
            return Ok(false);
        };
        self.comments.remove(id.to_key())?;
        self.item_comments
            .remove(pair_key(comment.item.to_key(), id.to_key()))?;
        if let Some(mut parent) = self.get_item(comment.item)? {
            parent.nested_count = parent.nested_count.saturating_sub(1);
            self.put_item(&parent)?;
        }
        Ok(true)
    }

    fn schema(&self) -> ItemSchema {
        self.schema
    }
}

impl ActivityCache for Database {
    fn refresh_recent_activity(&self, container: ContainerId) -> Result<(), DbError> {
        let mut visited = HashSet::new();
        let mut current = Some(container);
        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let mut record = self
                .get_container(id)?
                .ok_or_else(|| DbError::NotFound(format!("container {id}")))?;

            let mut latest: Option<(DateTime<Utc>, ItemId)> = None;
            let mut consider = |at: DateTime<Utc>, item: ItemId| {
                if latest.is_none_or(|(best, _)| at > best) {
                    latest = Some((at, item));
                }
            };
            for item in self.list_items(id)? {
                consider(item.last_activity_at, item.id);
            }
            for child in self.children(id)? {
                if let (Some(at), Some(item)) = (child.last_activity_at, child.last_item) {
                    consider(at, item);
                }
            }

            record.last_activity_at = latest.map(|(at, _)| at);
            record.last_item = latest.map(|(_, item)| item);
            self.put_container(&record)?;
            current = record.parent;
        }
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Best-effort flush on drop. Errors are ignored since we can't
        // propagate them from Drop. Callers should explicitly flush()
        // if they need guaranteed durability.
        let _ = self.db.flush();
    }
}
