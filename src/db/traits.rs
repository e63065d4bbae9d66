//! Storage seams consumed by the moderation engine
//!
//! The ledger and the bulk executors never talk to sled directly for content;
//! they go through these traits so a different record store (or a test
//! double that fails on demand) can stand in for [`Database`](super::Database).
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │  ItemStore           │     │  ActivityCache       │
//! │  get/count/create/   │     │  refresh_recent_     │
//! │  set_container/delete│     │  activity(container) │
//! └──────────▲───────────┘     └──────────▲───────────┘
//!            │ implements                 │
//!            └────────── Database ────────┘
//! ```

use super::error::DbError;
use super::records::{CommentRecord, ItemRecord, ItemSchema, NewItem};
use super::types::{CommentId, ContainerId, ItemId};

/// Content item storage primitives
pub trait ItemStore {
    /// Look up an item; `None` if it does not exist
    ///
    /// # Errors
    /// Returns `DbError` if the lookup or decoding fails.
    fn get_item(&self, id: ItemId) -> Result<Option<ItemRecord>, DbError>;

    /// Number of items directly owned by `container`
    ///
    /// # Errors
    /// Returns `DbError` if the index scan fails.
    fn count_items(&self, container: ContainerId) -> Result<u64, DbError>;

    /// Sum of `nested_count` over items directly owned by `container`
    ///
    /// # Errors
    /// Returns `DbError` if the index scan or item decoding fails.
    fn count_nested(&self, container: ContainerId) -> Result<u64, DbError>;

    /// Reassign an item to another container
    ///
    /// # Errors
    /// Returns `DbError::NotFound` if the item does not exist.
    fn set_container(&self, item: ItemId, container: ContainerId) -> Result<(), DbError>;

    /// Delete an item and its nested items; `false` if it did not exist
    ///
    /// # Errors
    /// Returns `DbError` if storage operations fail.
    fn delete_item(&self, item: ItemId) -> Result<bool, DbError>;

    /// Validate and create an item
    ///
    /// # Errors
    /// Returns `DbError::ValidationError` if the item violates the schema or
    /// names an unknown container.
    fn create_item(&self, item: NewItem) -> Result<ItemId, DbError>;

    /// Look up a nested item
    ///
    /// # Errors
    /// Returns `DbError` if the lookup or decoding fails.
    fn get_comment(&self, id: CommentId) -> Result<Option<CommentRecord>, DbError>;

    /// Delete a nested item, decrementing its parent's `nested_count`
    ///
    /// # Errors
    /// Returns `DbError` if storage operations fail.
    fn delete_comment(&self, id: CommentId) -> Result<bool, DbError>;

    /// Field limits applied by `create_item`
    fn schema(&self) -> ItemSchema;
}

/// The "most recent activity" cache kept on containers
pub trait ActivityCache {
    /// Recompute the cached latest activity of `container` and its ancestors
    ///
    /// # Errors
    /// Returns `DbError` if storage operations fail.
    fn refresh_recent_activity(&self, container: ContainerId) -> Result<(), DbError>;
}
