use colored::Colorize;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::auth::Capability;
use crate::db::{CommentId, ContainerId, ItemId};

/// Which bulk action produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperation {
    Move,
    Delete,
    DeleteComments,
}

impl BatchOperation {
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Move => "Move",
            Self::Delete => "Delete",
            Self::DeleteComments => "Delete Comments",
        }
    }

    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Move => "Moved",
            Self::Delete | Self::DeleteComments => "Deleted",
        }
    }

    /// Report key holding the processed count
    #[must_use]
    pub const fn count_key(self) -> &'static str {
        match self {
            Self::Move => "moved",
            Self::Delete | Self::DeleteComments => "deleted",
        }
    }
}

/// Lifecycle of one bulk batch
///
/// ```text
/// Pending ──► DestinationChecked ──► Filtering ──► Applying ──► Committed
///    │                                                 │
///    └──► Rejected                                     └──► PartiallyApplied
/// ```
///
/// Deletions have no destination and pass through `DestinationChecked`
/// without a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Pending,
    DestinationChecked,
    Filtering,
    Applying,
    Committed,
    Rejected,
    PartiallyApplied,
}

impl BatchState {
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::DestinationChecked | Self::Rejected)
                | (Self::DestinationChecked, Self::Filtering)
                | (Self::Filtering, Self::Applying)
                | (Self::Applying, Self::Committed | Self::PartiallyApplied)
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Rejected | Self::PartiallyApplied)
    }
}

/// Outcome counts of a bulk batch
///
/// Serialized camelCase, with `processed` named after the operation:
/// `moved` for moves, `deleted` for deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub operation: BatchOperation,
    pub total_checked: usize,
    pub allowed: usize,
    pub not_allowed: usize,
    /// Items moved or deleted
    pub processed: usize,
    /// Allowed entries whose side effect failed
    pub failed: usize,
    pub affected_containers: Vec<ContainerId>,
    pub state: BatchState,
}

impl BatchReport {
    #[must_use]
    pub const fn new(operation: BatchOperation) -> Self {
        Self {
            operation,
            total_checked: 0,
            allowed: 0,
            not_allowed: 0,
            processed: 0,
            failed: 0,
            affected_containers: Vec::new(),
            state: BatchState::Pending,
        }
    }

    pub(crate) fn transition(&mut self, next: BatchState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid batch transition {:?} -> {next:?}",
            self.state
        );
        debug!(operation = ?self.operation, from = ?self.state, to = ?next, "Batch state change");
        self.state = next;
    }

    pub fn print(&self) {
        println!("\n{}", format!("=== {} Summary ===", self.operation.title()).bold());
        println!("  {} {}", "Checked:".bold(), self.total_checked);
        println!("  {} {}", "✓ Allowed:".green(), self.allowed);
        if self.not_allowed > 0 {
            println!("  {} {}", "⊘ Not allowed:".yellow(), self.not_allowed);
        }
        println!("  {} {}", format!("✓ {}:", self.operation.verb()).green(), self.processed);
        if self.failed > 0 {
            println!("  {} {}", "✗ Failed:".red(), self.failed);
        }
        if !self.affected_containers.is_empty() {
            let ids: Vec<String> = self.affected_containers.iter().map(ToString::to_string).collect();
            println!("  {} {}", "Containers:".bold(), ids.join(", ").cyan());
        }
        if self.state == BatchState::PartiallyApplied {
            println!("{}", "Batch was only partially applied.".yellow());
        }
    }
}

impl Serialize for BatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BatchReport", 8)?;
        state.serialize_field("operation", &self.operation)?;
        state.serialize_field("totalChecked", &self.total_checked)?;
        state.serialize_field("allowed", &self.allowed)?;
        state.serialize_field("notAllowed", &self.not_allowed)?;
        state.serialize_field(self.operation.count_key(), &self.processed)?;
        state.serialize_field("failed", &self.failed)?;
        state.serialize_field("affectedContainers", &self.affected_containers)?;
        state.serialize_field("state", &self.state)?;
        state.end()
    }
}

/// Which items a batch applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSelection {
    Explicit(Vec<ItemId>),
    /// The actor's global discussion selection
    FromSelection,
}

/// Which comments a comment batch applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentSelection {
    Explicit(Vec<CommentId>),
    /// The actor's selection inside the discussion
    FromSelection,
}

/// Capabilities checked by the executors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationPolicy {
    /// Required on an item's current container to move it away
    pub move_requires: Vec<Capability>,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            move_requires: vec![Capability::Edit, Capability::Delete],
        }
    }
}

/// Drop repeated ids, keeping the first occurrence
pub(crate) fn dedup_preserving_order<T: PartialEq + Copy>(ids: &[T]) -> Vec<T> {
    let mut unique = Vec::with_capacity(ids.len());
    for &id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}
