//! Single funnel for a batch's side effects
//!
//! Executors never touch the store or the ledger directly while applying a
//! batch. Every mutation goes through a [`UnitOfWork`], which performs the
//! store call and stages the matching counter change in a [`BatchDelta`].
//! Nothing reaches the ledger until [`UnitOfWork::commit`], which applies one
//! delta per `(container, kind)` and then refreshes recent activity.
//!
//! The store has no multi-record transactions, so a failure between a store
//! call and `commit` leaves counters stale until a ledger refresh.

use tracing::{debug, warn};

use crate::db::{ActivityCache, CommentId, ContainerId, DbError, ItemId, ItemRecord, ItemStore, NewItem, StatKind};
use crate::ledger::{AggregateLedger, LedgerError};

/// Net change for one container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetDelta {
    pub items: i64,
    pub nested: i64,
}

impl NetDelta {
    #[must_use]
    pub const fn get(&self, kind: StatKind) -> i64 {
        match kind {
            StatKind::Item => self.items,
            StatKind::NestedItem => self.nested,
        }
    }
}

/// Per-container deltas in first-touch order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDelta {
    entries: Vec<(ContainerId, NetDelta)>,
}

impl BatchDelta {
    pub fn stage(&mut self, container: ContainerId, kind: StatKind, delta: i64) {
        let index = match self.entries.iter().position(|(id, _)| *id == container) {
            Some(index) => index,
            None => {
                self.entries.push((container, NetDelta::default()));
                self.entries.len() - 1
            }
        };
        let net = &mut self.entries[index].1;
        match kind {
            StatKind::Item => net.items += delta,
            StatKind::NestedItem => net.nested += delta,
        }
    }

    #[must_use]
    pub fn get(&self, container: ContainerId) -> NetDelta {
        self.entries
            .iter()
            .find(|(id, _)| *id == container)
            .map(|(_, net)| *net)
            .unwrap_or_default()
    }

    /// Every container staged so far, including those whose net is zero
    #[must_use]
    pub fn containers(&self) -> Vec<ContainerId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct UnitOfWork<'a, S: ?Sized> {
    store: &'a S,
    ledger: &'a AggregateLedger<'a>,
    delta: BatchDelta,
}

impl<'a, S> UnitOfWork<'a, S>
where
    S: ItemStore + ActivityCache + ?Sized,
{
    pub fn new(store: &'a S, ledger: &'a AggregateLedger<'a>) -> Self {
        Self {
            store,
            ledger,
            delta: BatchDelta::default(),
        }
    }

    #[must_use]
    pub const fn delta(&self) -> &BatchDelta {
        &self.delta
    }

    /// Create an item, counting it in its container
    ///
    /// # Errors
    /// Returns the store's error; nothing is staged on failure.
    pub fn create_item(&mut self, item: NewItem) -> Result<ItemId, DbError> {
        let container = item.container;
        let id = self.store.create_item(item)?;
        self.delta.stage(container, StatKind::Item, 1);
        Ok(id)
    }

    /// Reassign `item` to `destination`, carrying its nested count along
    ///
    /// # Errors
    /// Returns the store's error; nothing is staged on failure.
    pub fn relocate(&mut self, item: &ItemRecord, destination: ContainerId) -> Result<(), DbError> {
        self.store.set_container(item.id, destination)?;
        let nested = i64::try_from(item.nested_count).unwrap_or(i64::MAX);
        self.delta.stage(item.container, StatKind::Item, -1);
        self.delta.stage(item.container, StatKind::NestedItem, -nested);
        self.delta.stage(destination, StatKind::Item, 1);
        self.delta.stage(destination, StatKind::NestedItem, nested);
        Ok(())
    }

    /// Delete `item` and its nested items; `false` if it was already gone
    ///
    /// # Errors
    /// Returns the store's error; nothing is staged on failure.
    pub fn delete_item(&mut self, item: &ItemRecord) -> Result<bool, DbError> {
        if !self.store.delete_item(item.id)? {
            return Ok(false);
        }
        let nested = i64::try_from(item.nested_count).unwrap_or(i64::MAX);
        self.delta.stage(item.container, StatKind::Item, -1);
        self.delta.stage(item.container, StatKind::NestedItem, -nested);
        Ok(true)
    }

    /// Delete one nested item belonging to an item in `container`
    ///
    /// # Errors
    /// Returns the store's error; nothing is staged on failure.
    pub fn delete_comment(&mut self, comment: CommentId, container: ContainerId) -> Result<bool, DbError> {
        if !self.store.delete_comment(comment)? {
            return Ok(false);
        }
        self.delta.stage(container, StatKind::NestedItem, -1);
        Ok(true)
    }

    /// Apply the staged deltas and refresh recent activity
    ///
    /// Returns the touched containers in first-touch order. Activity refresh
    /// runs for every touched container even when its net change is zero;
    /// refresh failures are logged and do not fail the commit.
    ///
    /// # Errors
    /// Returns `LedgerError` if a delta cannot be applied.
    pub fn commit(self) -> Result<Vec<ContainerId>, LedgerError> {
        let touched = self.delta.containers();
        for &container in &touched {
            let net = self.delta.get(container);
            for kind in StatKind::ALL {
                self.ledger.apply_delta(container, kind, net.get(kind))?;
            }
        }
        for &container in &touched {
            if let Err(e) = self.store.refresh_recent_activity(container) {
                warn!(%container, "Failed to refresh recent activity: {e}");
            }
        }
        debug!(containers = touched.len(), "Committed batch delta");
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlakyStore, TestDb, TestForum, seed_discussion};

    #[test]
    fn test_batch_delta_nets_and_keeps_order() {
        let mut delta = BatchDelta::default();
        let (a, b) = (ContainerId::new(2), ContainerId::new(1));
        delta.stage(a, StatKind::Item, -1);
        delta.stage(b, StatKind::Item, 1);
        delta.stage(a, StatKind::Item, 1);
        delta.stage(b, StatKind::NestedItem, 4);

        assert_eq!(delta.containers(), vec![a, b]);
        assert_eq!(delta.get(a), NetDelta { items: 0, nested: 0 });
        assert_eq!(delta.get(b), NetDelta { items: 1, nested: 4 });
        assert_eq!(delta.get(ContainerId::new(9)), NetDelta::default());
    }

    #[test]
    fn test_nothing_reaches_ledger_before_commit() {
        let test_db = TestDb::new();
        let db = test_db.db();
        let forum = TestForum::create(db);
        let ledger = AggregateLedger::load(db).unwrap();
        let item_id = seed_discussion(db, &ledger, forum.a1, "Moving", 2);
        let item = db.get_item(item_id).unwrap().unwrap();

        let mut uow = UnitOfWork::new(db, &ledger);
        uow.relocate(&item, forum.b).unwrap();
        assert_eq!(ledger.counts(forum.b).unwrap().own.items, 0);
        assert_eq!(db.get_item(item_id).unwrap().unwrap().container, forum.b);

        let touched = uow.commit().unwrap();
        assert_eq!(touched, vec![forum.a1, forum.b]);
        assert_eq!(ledger.counts(forum.b).unwrap().own.items, 1);
        assert_eq!(ledger.counts(forum.b).unwrap().own.nested, 2);
        assert_eq!(ledger.counts(forum.a).unwrap().aggregate.items, 0);
        assert!(ledger.verify().unwrap().is_empty());
    }

    #[test]
    fn test_commit_refreshes_zero_net_containers() {
        let test_db = TestDb::new();
        let db = test_db.db();
        let forum = TestForum::create(db);
        let ledger = AggregateLedger::load(db).unwrap();
        let item_id = seed_discussion(db, &ledger, forum.b, "Round trip", 0);
        let store = FlakyStore::new(db);

        let mut uow = UnitOfWork::new(&store, &ledger);
        let item = db.get_item(item_id).unwrap().unwrap();
        uow.relocate(&item, forum.a).unwrap();
        let moved = db.get_item(item_id).unwrap().unwrap();
        uow.relocate(&moved, forum.b).unwrap();
        assert_eq!(uow.delta().get(forum.a), NetDelta::default());
        assert_eq!(uow.delta().get(forum.b), NetDelta::default());

        assert_eq!(uow.commit().unwrap(), vec![forum.b, forum.a]);
        assert_eq!(store.refreshed(), vec![forum.b, forum.a]);
        assert_eq!(ledger.counts(forum.b).unwrap().own.items, 1);
        assert!(ledger.verify().unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_item_stages_nothing() {
        let test_db = TestDb::new();
        let db = test_db.db();
        let forum = TestForum::create(db);
        let ledger = AggregateLedger::load(db).unwrap();
        let item_id = seed_discussion(db, &ledger, forum.b, "Gone", 0);
        let item = db.get_item(item_id).unwrap().unwrap();
        db.delete_item(item_id).unwrap();

        let mut uow = UnitOfWork::new(db, &ledger);
        assert!(!uow.delete_item(&item).unwrap());
        assert!(uow.delta().is_empty());
    }
}
