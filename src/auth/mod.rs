//! Capability checks consumed by the moderation executors
//!
//! Permission decisions are made elsewhere; the executors only ask a yes/no
//! question through [`Authorizer`]. Two answers are provided here: a
//! [`GrantTable`] built from configuration, and any plain closure.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{ActorId, ContainerId};

/// What an actor may do within a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Add,
    Edit,
    Delete,
}

impl Capability {
    pub const ALL: [Self; 3] = [Self::Add, Self::Edit, Self::Delete];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown capability: {0}")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            _ => Err(UnknownCapability(s.to_string())),
        }
    }
}

/// Yes/no capability decision
pub trait Authorizer {
    fn has_capability(&self, actor: ActorId, container: ContainerId, capability: Capability) -> bool;

    /// True only if every capability in `required` is held
    fn has_all(&self, actor: ActorId, container: ContainerId, required: &[Capability]) -> bool {
        required
            .iter()
            .all(|&capability| self.has_capability(actor, container, capability))
    }
}

impl<F> Authorizer for F
where
    F: Fn(ActorId, ContainerId, Capability) -> bool,
{
    fn has_capability(&self, actor: ActorId, container: ContainerId, capability: Capability) -> bool {
        self(actor, container, capability)
    }
}

/// One `[[grants]]` entry from the configuration file
///
/// A grant without a container applies everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub actor: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerId>,
    pub capabilities: Vec<Capability>,
}

/// In-memory capability table
///
/// Grants are matched on the exact container; they are not inherited by
/// child containers.
#[derive(Debug, Clone, Default)]
pub struct GrantTable {
    global: HashMap<ActorId, HashSet<Capability>>,
    scoped: HashMap<(ActorId, ContainerId), HashSet<Capability>>,
}

impl GrantTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_grants(grants: &[Grant]) -> Self {
        let mut table = Self::new();
        for grant in grants {
            table.grant(grant.actor, grant.container, grant.capabilities.iter().copied());
        }
        table
    }

    pub fn grant<I>(&mut self, actor: ActorId, container: Option<ContainerId>, capabilities: I)
    where
        I: IntoIterator<Item = Capability>,
    {
        let entry = match container {
            Some(container) => self.scoped.entry((actor, container)).or_default(),
            None => self.global.entry(actor).or_default(),
        };
        entry.extend(capabilities);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.scoped.is_empty()
    }
}

impl Authorizer for GrantTable {
    fn has_capability(&self, actor: ActorId, container: ContainerId, capability: Capability) -> bool {
        self.global
            .get(&actor)
            .is_some_and(|caps| caps.contains(&capability))
            || self
                .scoped
                .get(&(actor, container))
                .is_some_and(|caps| caps.contains(&capability))
    }
}
