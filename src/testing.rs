//! Testing utilities for modr
//!
//! This module provides helper types for writing tests, including a `TestDb`
//! wrapper for temporary database management and `TestForum`, a small
//! container tree with posted content.
//!
//! Only available when compiled with `cfg(test)`.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::path::Path;

use tempfile::TempDir;

use crate::content::{post_comment, post_item};
use crate::db::{
    ActivityCache, CommentId, CommentRecord, ContainerId, Database, DbError, ItemId, ItemRecord,
    ItemSchema, ItemStore, NewItem,
};
use crate::ledger::AggregateLedger;

/// Wrapper for a temporary test database that cleans up on drop
///
/// The database lives in its own temporary directory, so parallel tests
/// never share state.
pub struct TestDb {
    // Declared before `dir` so the database is dropped (and flushed) first
    db: Database,
    dir: TempDir,
}

impl TestDb {
    /// Create a fresh, empty database with the default item schema
    ///
    /// # Panics
    /// Panics if the temporary directory or the database cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schema(ItemSchema::default())
    }

    /// Create a fresh, empty database enforcing `schema`
    ///
    /// # Panics
    /// Panics if the temporary directory or the database cannot be created.
    #[must_use]
    pub fn with_schema(schema: ItemSchema) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = Database::open_with_schema(dir.path().join("db"), schema)
            .expect("Failed to open test database");
        Self { db, dir }
    }

    /// Get a reference to the underlying database
    #[must_use]
    pub const fn db(&self) -> &Database {
        &self.db
    }

    /// Get the directory holding the test database
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Container tree used across moderation tests
///
/// ```text
/// root
/// ├── a
/// │   └── a1
/// └── b
/// ```
pub struct TestForum {
    pub root: ContainerId,
    pub a: ContainerId,
    pub a1: ContainerId,
    pub b: ContainerId,
}

impl TestForum {
    /// Create the tree in `db`
    ///
    /// # Panics
    /// Panics if any container cannot be created.
    #[must_use]
    pub fn create(db: &Database) -> Self {
        let root = db.create_container("root", None).unwrap();
        let a = db.create_container("a", Some(root)).unwrap();
        let a1 = db.create_container("a1", Some(a)).unwrap();
        let b = db.create_container("b", Some(root)).unwrap();
        Self { root, a, a1, b }
    }
}

/// Post a discussion with `comments` comments, keeping the ledger in step
///
/// # Panics
/// Panics if posting fails.
pub fn seed_discussion(
    db: &Database,
    ledger: &AggregateLedger<'_>,
    container: ContainerId,
    title: &str,
    comments: usize,
) -> ItemId {
    let item = post_item(db, ledger, NewItem::discussion(container, title, "body")).unwrap();
    for n in 0..comments {
        post_comment(db, ledger, item, &format!("comment {n}")).unwrap();
    }
    item
}

/// What an injected `create_item` failure looks like
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CreateFailure {
    /// The record is rejected by schema validation
    #[default]
    Validation,
    /// The write itself fails
    Storage,
}

/// Store wrapper that fails on request and records activity refreshes
///
/// Everything else is delegated to the wrapped [`Database`].
pub struct FlakyStore<'a> {
    db: &'a Database,
    /// Fail the n-th `create_item` call (1-based)
    pub fail_create_on: Option<usize>,
    /// Error returned by the failing `create_item` call
    pub create_failure: CreateFailure,
    /// Items whose deletion fails with a storage error
    pub fail_delete: HashSet<ItemId>,
    creates: Cell<usize>,
    refreshed: RefCell<Vec<ContainerId>>,
}

impl<'a> FlakyStore<'a> {
    #[must_use]
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            fail_create_on: None,
            create_failure: CreateFailure::default(),
            fail_delete: HashSet::new(),
            creates: Cell::new(0),
            refreshed: RefCell::new(Vec::new()),
        }
    }

    /// Containers passed to `refresh_recent_activity`, in call order
    #[must_use]
    pub fn refreshed(&self) -> Vec<ContainerId> {
        self.refreshed.borrow().clone()
    }
}

impl ItemStore for FlakyStore<'_> {
    fn get_item(&self, id: ItemId) -> Result<Option<ItemRecord>, DbError> {
        self.db.get_item(id)
    }

    fn count_items(&self, container: ContainerId) -> Result<u64, DbError> {
        self.db.count_items(container)
    }

    fn count_nested(&self, container: ContainerId) -> Result<u64, DbError> {
        self.db.count_nested(container)
    }

    fn set_container(&self, item: ItemId, container: ContainerId) -> Result<(), DbError> {
        self.db.set_container(item, container)
    }

    fn delete_item(&self, item: ItemId) -> Result<bool, DbError> {
        if self.fail_delete.contains(&item) {
            return Err(DbError::SerializeError(format!("injected failure deleting item {item}")));
        }
        self.db.delete_item(item)
    }

    fn create_item(&self, item: NewItem) -> Result<ItemId, DbError> {
        let call = self.creates.get() + 1;
        self.creates.set(call);
        if self.fail_create_on == Some(call) {
            return Err(match self.create_failure {
                CreateFailure::Validation => DbError::ValidationError(format!("injected rejection of create #{call}")),
                CreateFailure::Storage => DbError::SerializeError(format!("injected failure writing create #{call}")),
            });
        }
        self.db.create_item(item)
    }

    fn get_comment(&self, id: CommentId) -> Result<Option<CommentRecord>, DbError> {
        self.db.get_comment(id)
    }

    fn delete_comment(&self, id: CommentId) -> Result<bool, DbError> {
        self.db.delete_comment(id)
    }

    fn schema(&self) -> ItemSchema {
        self.db.item_schema()
    }
}

impl ActivityCache for FlakyStore<'_> {
    fn refresh_recent_activity(&self, container: ContainerId) -> Result<(), DbError> {
        self.refreshed.borrow_mut().push(container);
        self.db.refresh_recent_activity(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_basic() {
        let test_db = TestDb::new();
        assert!(test_db.path().exists());
        assert!(test_db.db().list_containers().unwrap().is_empty());
    }

    #[test]
    fn test_db_cleanup() {
        let path = {
            let test_db = TestDb::new();
            test_db.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_forum_shape() {
        let test_db = TestDb::new();
        let db = test_db.db();
        let forum = TestForum::create(db);

        assert_eq!(db.get_container(forum.a1).unwrap().unwrap().parent, Some(forum.a));
        assert_eq!(db.get_container(forum.b).unwrap().unwrap().parent, Some(forum.root));
        assert_eq!(db.children(forum.root).unwrap().len(), 2);
    }

    #[test]
    fn test_seed_discussion_counts_comments() {
        let test_db = TestDb::new();
        let db = test_db.db();
        let forum = TestForum::create(db);
        let ledger = AggregateLedger::load(db).unwrap();

        let item = seed_discussion(db, &ledger, forum.a1, "Seeded", 4);

        assert_eq!(db.get_item(item).unwrap().unwrap().nested_count, 4);
        assert_eq!(ledger.counts(forum.root).unwrap().aggregate.nested, 4);
    }
}
