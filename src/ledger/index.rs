//! Arena index over the container hierarchy
//!
//! Containers are stored once in a `Vec` and refer to each other by slot
//! number, so walking from a container to the root is a chain of index
//! lookups. Construction rejects dangling parents and cycles, which is what
//! lets every ancestor walk assume it terminates.

use std::collections::HashMap;

use super::error::LedgerError;
use crate::db::ContainerId;

#[derive(Debug, Clone)]
struct Node {
    id: ContainerId,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Parent-pointer index of every known container
#[derive(Debug, Clone, Default)]
pub struct ContainerIndex {
    nodes: Vec<Node>,
    slots: HashMap<ContainerId, usize>,
}

impl ContainerIndex {
    /// Build the index from `(container, parent)` pairs
    ///
    /// # Errors
    /// Returns `LedgerError::OrphanContainer` if a parent is not among the
    /// entries, or `LedgerError::Cycle` if parent links loop.
    pub fn build<I>(entries: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = (ContainerId, Option<ContainerId>)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        let mut index = Self::default();

        for &(id, _) in &entries {
            index.slots.insert(id, index.nodes.len());
            index.nodes.push(Node {
                id,
                parent: None,
                children: Vec::new(),
            });
        }

        for &(id, parent) in &entries {
            let Some(parent) = parent else { continue };
            let child_slot = index.slots[&id];
            let parent_slot = *index
                .slots
                .get(&parent)
                .ok_or(LedgerError::OrphanContainer { container: id, parent })?;
            index.nodes[child_slot].parent = Some(parent_slot);
            index.nodes[parent_slot].children.push(child_slot);
        }

        for node in &index.nodes {
            let mut steps = 0;
            let mut current = node.parent;
            while let Some(slot) = current {
                steps += 1;
                if steps > index.nodes.len() {
                    return Err(LedgerError::Cycle(node.id));
                }
                current = index.nodes[slot].parent;
            }
        }

        Ok(index)
    }

    fn slot(&self, id: ContainerId) -> Result<usize, LedgerError> {
        self.slots
            .get(&id)
            .copied()
            .ok_or(LedgerError::UnknownContainer(id))
    }

    #[must_use]
    pub fn contains(&self, id: ContainerId) -> bool {
        self.slots.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All containers in insertion (id) order
    pub fn ids(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    #[must_use]
    pub fn parent(&self, id: ContainerId) -> Option<ContainerId> {
        let slot = self.slots.get(&id)?;
        self.nodes[*slot].parent.map(|p| self.nodes[p].id)
    }

    #[must_use]
    pub fn children(&self, id: ContainerId) -> Vec<ContainerId> {
        self.slots.get(&id).map_or_else(Vec::new, |&slot| {
            self.nodes[slot].children.iter().map(|&c| self.nodes[c].id).collect()
        })
    }

    #[must_use]
    pub fn roots(&self) -> Vec<ContainerId> {
        self.nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect()
    }

    /// `id` followed by each of its ancestors up to and including the root
    ///
    /// # Errors
    /// Returns `LedgerError::UnknownContainer` if `id` is not indexed.
    pub fn ancestors(&self, id: ContainerId) -> Result<Ancestors<'_>, LedgerError> {
        Ok(Ancestors {
            index: self,
            next: Some(self.slot(id)?),
        })
    }

    /// Number of ancestors above `id` (zero for a root)
    #[must_use]
    pub fn depth(&self, id: ContainerId) -> usize {
        self.ancestors(id).map_or(0, |a| a.count().saturating_sub(1))
    }

    /// The subtree rooted at `id`, children before parents
    ///
    /// # Errors
    /// Returns `LedgerError::UnknownContainer` if `id` is not indexed.
    pub fn subtree_post_order(&self, id: ContainerId) -> Result<Vec<ContainerId>, LedgerError> {
        let mut order = Vec::new();
        let mut stack = vec![(self.slot(id)?, false)];
        while let Some((slot, expanded)) = stack.pop() {
            if expanded {
                order.push(self.nodes[slot].id);
                continue;
            }
            stack.push((slot, true));
            for &child in self.nodes[slot].children.iter().rev() {
                stack.push((child, false));
            }
        }
        Ok(order)
    }
}

/// Iterator over a container and its ancestors
pub struct Ancestors<'a> {
    index: &'a ContainerIndex,
    next: Option<usize>,
}

impl Iterator for Ancestors<'_> {
    type Item = ContainerId;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        let node = &self.index.nodes[slot];
        self.next = node.parent;
        Some(node.id)
    }
}
