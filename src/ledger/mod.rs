//! Aggregate counter ledger
//!
//! Every container carries two counter cells per [`StatKind`]: its own count
//! (content it directly owns) and an aggregate count (own plus every
//! descendant's). This module is the only writer of those cells.
//!
//! Incremental maintenance goes through [`AggregateLedger::apply_delta`],
//! which walks from the container to the root adding the same delta to each
//! aggregate. When incremental updates can no longer be trusted,
//! [`AggregateLedger::refresh`] recomputes a subtree from the record store.

pub mod error;
pub mod index;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{ContainerId, CounterKey, CounterScope, Database, ItemStore, StatKind};

pub use error::LedgerError;
pub use index::ContainerIndex;

/// A pair of counts, one per [`StatKind`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub items: u64,
    pub nested: u64,
}

impl Counts {
    #[must_use]
    pub const fn get(&self, kind: StatKind) -> u64 {
        match kind {
            StatKind::Item => self.items,
            StatKind::NestedItem => self.nested,
        }
    }

    const fn set(&mut self, kind: StatKind, value: u64) {
        match kind {
            StatKind::Item => self.items = value,
            StatKind::NestedItem => self.nested = value,
        }
    }
}

/// Own and aggregate counters of one container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContainerCounts {
    pub own: Counts,
    pub aggregate: Counts,
}

/// An aggregate counter that disagrees with own + sum of children
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inconsistency {
    pub container: ContainerId,
    pub kind: StatKind,
    pub stored: u64,
    pub expected: u64,
}

/// Maintains hierarchical counters over a loaded container index
pub struct AggregateLedger<'a> {
    db: &'a Database,
    index: ContainerIndex,
}

impl<'a> AggregateLedger<'a> {
    /// Load the container hierarchy from `db`
    ///
    /// # Errors
    /// Returns `LedgerError` if the containers cannot be read or do not form a forest.
    pub fn load(db: &'a Database) -> Result<Self, LedgerError> {
        let index = Self::build_index(db)?;
        debug!(containers = index.len(), "Loaded container index");
        Ok(Self { db, index })
    }

    fn build_index(db: &Database) -> Result<ContainerIndex, LedgerError> {
        let entries = db.list_containers()?.into_iter().map(|c| (c.id, c.parent));
        ContainerIndex::build(entries)
    }

    /// Re-read the hierarchy after containers were added
    ///
    /// # Errors
    /// Returns `LedgerError` if the containers cannot be read or do not form a forest.
    pub fn reload(&mut self) -> Result<(), LedgerError> {
        self.index = Self::build_index(self.db)?;
        Ok(())
    }

    #[must_use]
    pub const fn index(&self) -> &ContainerIndex {
        &self.index
    }

    /// Add `delta` to the own counter of `container` and to the aggregate
    /// counter of `container` and every ancestor
    ///
    /// Results below zero are stored as zero and logged.
    ///
    /// # Errors
    /// Returns `LedgerError::UnknownContainer` if `container` is not indexed.
    pub fn apply_delta(&self, container: ContainerId, kind: StatKind, delta: i64) -> Result<(), LedgerError> {
        if delta == 0 {
            return Ok(());
        }
        let chain: Vec<ContainerId> = self.index.ancestors(container)?.collect();

        let own = self
            .db
            .add_to_counter(CounterKey::new(container, CounterScope::Own, kind), delta)?;
        if own.clamped {
            warn!(%container, %kind, delta, "Own counter clamped at zero");
        }

        for id in &chain {
            let update = self
                .db
                .add_to_counter(CounterKey::new(*id, CounterScope::Aggregate, kind), delta)?;
            if update.clamped {
                warn!(container = %id, %kind, delta, "Aggregate counter clamped at zero");
            }
        }

        debug!(%container, %kind, delta, depth = chain.len(), "Applied counter delta");
        Ok(())
    }

    /// Recompute own and aggregate counters for the subtree rooted at
    /// `container` from `store`, then carry the change in its aggregate up
    /// to every ancestor
    ///
    /// # Errors
    /// Returns `LedgerError::UnknownContainer` if `container` is not indexed,
    /// or `LedgerError::Db` if counting fails.
    pub fn refresh<S>(&self, container: ContainerId, store: &S) -> Result<(), LedgerError>
    where
        S: ItemStore + ?Sized,
    {
        let order = self.index.subtree_post_order(container)?;
        let before = self.read(container, CounterScope::Aggregate)?;

        let mut aggregates: HashMap<ContainerId, Counts> = HashMap::with_capacity(order.len());
        for &id in &order {
            let own = Counts {
                items: store.count_items(id)?,
                nested: store.count_nested(id)?,
            };
            let mut aggregate = own;
            for child in self.index.children(id) {
                if let Some(sub) = aggregates.get(&child) {
                    aggregate.items += sub.items;
                    aggregate.nested += sub.nested;
                }
            }
            for kind in StatKind::ALL {
                self.db
                    .set_counter(CounterKey::new(id, CounterScope::Own, kind), own.get(kind))?;
                self.db
                    .set_counter(CounterKey::new(id, CounterScope::Aggregate, kind), aggregate.get(kind))?;
            }
            aggregates.insert(id, aggregate);
        }

        let after = aggregates.get(&container).copied().unwrap_or_default();
        for kind in StatKind::ALL {
            let shift = signed_difference(after.get(kind), before.get(kind));
            if shift == 0 {
                continue;
            }
            for ancestor in self.index.ancestors(container)?.skip(1) {
                let update = self
                    .db
                    .add_to_counter(CounterKey::new(ancestor, CounterScope::Aggregate, kind), shift)?;
                if update.clamped {
                    warn!(container = %ancestor, %kind, shift, "Aggregate counter clamped at zero during refresh");
                }
            }
        }

        info!(%container, containers = order.len(), "Refreshed counters");
        Ok(())
    }

    /// Refresh every root, rebuilding all counters
    ///
    /// # Errors
    /// Returns `LedgerError` if counting or writing fails.
    pub fn refresh_all<S>(&self, store: &S) -> Result<(), LedgerError>
    where
        S: ItemStore + ?Sized,
    {
        for root in self.index.roots() {
            self.refresh(root, store)?;
        }
        Ok(())
    }

    fn read(&self, container: ContainerId, scope: CounterScope) -> Result<Counts, LedgerError> {
        let mut counts = Counts::default();
        for kind in StatKind::ALL {
            counts.set(kind, self.db.counter(CounterKey::new(container, scope, kind))?);
        }
        Ok(counts)
    }

    /// Current counters of `container`
    ///
    /// # Errors
    /// Returns `LedgerError::UnknownContainer` if `container` is not indexed.
    pub fn counts(&self, container: ContainerId) -> Result<ContainerCounts, LedgerError> {
        if !self.index.contains(container) {
            return Err(LedgerError::UnknownContainer(container));
        }
        Ok(ContainerCounts {
            own: self.read(container, CounterScope::Own)?,
            aggregate: self.read(container, CounterScope::Aggregate)?,
        })
    }

    /// Check `aggregate = own + sum(children aggregate)` everywhere
    ///
    /// # Errors
    /// Returns `LedgerError::Db` if counters cannot be read.
    pub fn verify(&self) -> Result<Vec<Inconsistency>, LedgerError> {
        let mut problems = Vec::new();
        for id in self.index.ids() {
            let own = self.read(id, CounterScope::Own)?;
            let stored = self.read(id, CounterScope::Aggregate)?;
            let mut expected = own;
            for child in self.index.children(id) {
                let sub = self.read(child, CounterScope::Aggregate)?;
                expected.items += sub.items;
                expected.nested += sub.nested;
            }
            for kind in StatKind::ALL {
                if stored.get(kind) != expected.get(kind) {
                    problems.push(Inconsistency {
                        container: id,
                        kind,
                        stored: stored.get(kind),
                        expected: expected.get(kind),
                    });
                }
            }
        }
        Ok(problems)
    }
}

fn signed_difference(after: u64, before: u64) -> i64 {
    let diff = i128::from(after) - i128::from(before);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}
