//! Posting helpers that keep the ledger in step with new content
//!
//! Creating an item or comment directly through [`ItemStore`] leaves the
//! aggregate counters stale until the next refresh. These helpers pair each
//! creation with its `+1` delta.

use thiserror::Error;
use tracing::debug;

use crate::db::{ActivityCache, CommentId, Database, DbError, ItemId, ItemStore, NewItem, StatKind};
use crate::ledger::{AggregateLedger, LedgerError};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Create an item and count it in its container
///
/// # Errors
/// Returns `ContentError::Db` if the item fails validation or storage fails,
/// and `ContentError::Ledger` if its container is unknown to the ledger.
pub fn post_item<S>(store: &S, ledger: &AggregateLedger<'_>, item: NewItem) -> Result<ItemId, ContentError>
where
    S: ItemStore + ActivityCache + ?Sized,
{
    let container = item.container;
    let id = store.create_item(item)?;
    ledger.apply_delta(container, StatKind::Item, 1)?;
    store.refresh_recent_activity(container)?;
    debug!(item = %id, %container, "Posted item");
    Ok(id)
}

/// Add a comment under `item` and count it in the item's container
///
/// # Errors
/// Returns `ContentError::Db` if the item is missing or closed.
pub fn post_comment(
    db: &Database,
    ledger: &AggregateLedger<'_>,
    item: ItemId,
    body: &str,
) -> Result<CommentId, ContentError> {
    let id = db.add_comment(item, body)?;
    let container = db
        .get_item(item)?
        .ok_or_else(|| DbError::NotFound(format!("item {item}")))?
        .container;
    ledger.apply_delta(container, StatKind::NestedItem, 1)?;
    db.refresh_recent_activity(container)?;
    Ok(id)
}
