use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::core::{BatchOperation, BatchReport, BatchState, ItemSelection};
use super::error::ModerationError;
use super::unit_of_work::UnitOfWork;
use super::{Moderator, Result};
use crate::auth::{Authorizer, Capability};
use crate::db::{ActivityCache, ActorId, ContainerId, DbError, ItemId, ItemStore};
use crate::ledger::LedgerError;
use crate::selection::{Scope, SelectionKey};

/// A move batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub items: ItemSelection,
    pub destination: ContainerId,
    pub leave_redirect: bool,
}

/// Request-facing form of [`MoveRequest`]
///
/// `{"itemIds": [..], "useSelection": false, "destinationContainerId": 3, "leaveRedirect": true}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_ids: Option<Vec<ItemId>>,
    #[serde(default)]
    pub use_selection: bool,
    pub destination_container_id: ContainerId,
    #[serde(default)]
    pub leave_redirect: bool,
}

impl From<RelocationRequest> for MoveRequest {
    fn from(request: RelocationRequest) -> Self {
        let items = if request.use_selection {
            ItemSelection::FromSelection
        } else {
            ItemSelection::Explicit(request.item_ids.unwrap_or_default())
        };
        Self {
            items,
            destination: request.destination_container_id,
            leave_redirect: request.leave_redirect,
        }
    }
}

/// Why the apply loop stopped early
enum Halt {
    Rejected(String),
    Storage(LedgerError),
}

impl<S, A> Moderator<'_, S, A>
where
    S: ItemStore + ActivityCache + ?Sized,
    A: Authorizer + ?Sized,
{
    /// Move items to another container
    ///
    /// The destination is checked before anything changes: an unknown
    /// destination is `NotFound` and a missing `Add` capability on it is
    /// `Forbidden`. Items that no longer exist, or whose current container
    /// lacks the policy's capabilities, are counted as not allowed.
    ///
    /// Allowed items are processed in order. With `leave_redirect`, every
    /// allowed item gets a stub in the container it occupied, including one
    /// already sitting in the destination. When a stub cannot be created,
    /// processing stops; items already moved stay moved, their deltas are
    /// committed, and the error carries the partial report. The same holds
    /// when committing the deltas fails.
    ///
    /// # Errors
    /// Returns `ModerationError::Forbidden` or `NotFound` before anything
    /// changes, `ValidationFailed` or `Interrupted` with the partial report,
    /// or a storage error raised while filtering.
    pub fn move_items(&self, actor: ActorId, request: &MoveRequest) -> Result<BatchReport> {
        let mut report = BatchReport::new(BatchOperation::Move);
        let ids = self.resolve_items(actor, &request.items)?;
        let destination = request.destination;

        if !self.ledger.index().contains(destination) {
            return Err(ModerationError::NotFound(format!("container {destination}")));
        }
        if !self
            .authorizer
            .has_capability(actor, destination, Capability::Add)
        {
            report.transition(BatchState::Rejected);
            warn!(%actor, %destination, "Move rejected: no add capability on destination");
            return Err(ModerationError::Forbidden {
                actor,
                container: destination,
                capability: Capability::Add,
            });
        }
        report.transition(BatchState::DestinationChecked);

        report.transition(BatchState::Filtering);
        report.total_checked = ids.len();
        let mut allowed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get_item(id)? {
                Some(item)
                    if self
                        .authorizer
                        .has_all(actor, item.container, &self.policy.move_requires) =>
                {
                    allowed.push(item);
                }
                Some(item) => debug!(item = %id, container = %item.container, "Move not allowed"),
                None => debug!(item = %id, "Move skipped: item not found"),
            }
        }
        report.allowed = allowed.len();
        report.not_allowed = report.total_checked - report.allowed;

        report.transition(BatchState::Applying);
        let max_title_length = self.store.schema().max_title_length;
        let mut uow = UnitOfWork::new(self.store, self.ledger);
        let mut moved_keys = Vec::new();
        let mut halt = None;
        for item in &allowed {
            if request.leave_redirect {
                let stub = self.redirects.stub_for(item, max_title_length);
                match uow.create_item(stub) {
                    Ok(stub_id) => debug!(item = %item.id, stub = %stub_id, "Created redirect stub"),
                    Err(DbError::ValidationError(message)) => {
                        halt = Some(Halt::Rejected(message));
                        break;
                    }
                    Err(e) => {
                        halt = Some(Halt::Storage(e.into()));
                        break;
                    }
                }
            }
            match uow.relocate(item, destination) {
                Ok(()) => {
                    report.processed += 1;
                    moved_keys.push(SelectionKey::discussion(item.id));
                    debug!(item = %item.id, from = %item.container, to = %destination, "Moved item");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(item = %item.id, "Failed to move item: {e}");
                }
            }
        }

        report.affected_containers = uow.delta().containers();
        match uow.commit() {
            Ok(touched) => report.affected_containers = touched,
            Err(e) => halt = Some(Halt::Storage(e)),
        }
        let complete = halt.is_none() && report.failed == 0;
        report.transition(if complete {
            BatchState::Committed
        } else {
            BatchState::PartiallyApplied
        });

        if request.items == ItemSelection::FromSelection {
            if halt.is_none() {
                self.consume_selection(actor, Scope::Global, report.state, &moved_keys)?;
            } else {
                self.consume_selection_after_error(actor, Scope::Global, report.state, &moved_keys);
            }
        }

        match halt {
            None => {
                info!(
                    %actor, %destination,
                    checked = report.total_checked,
                    moved = report.processed,
                    not_allowed = report.not_allowed,
                    "Move batch committed"
                );
                Ok(report)
            }
            Some(Halt::Rejected(message)) => {
                warn!(%actor, moved = report.processed, "Move batch halted: {message}");
                Err(ModerationError::ValidationFailed {
                    message,
                    report: Box::new(report),
                })
            }
            Some(Halt::Storage(source)) => {
                warn!(%actor, moved = report.processed, "Move batch interrupted: {source}");
                Err(ModerationError::Interrupted {
                    source,
                    report: Box::new(report),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocation_request_explicit() {
        let request: RelocationRequest = serde_json::from_str(
            r#"{"itemIds": [4, 5], "destinationContainerId": 9, "leaveRedirect": true}"#,
        )
        .unwrap();
        let request = MoveRequest::from(request);
        assert_eq!(request.items, ItemSelection::Explicit(vec![ItemId::new(4), ItemId::new(5)]));
        assert_eq!(request.destination, ContainerId::new(9));
        assert!(request.leave_redirect);
    }

    #[test]
    fn test_relocation_request_from_selection() {
        let request: RelocationRequest =
            serde_json::from_str(r#"{"useSelection": true, "destinationContainerId": 2}"#).unwrap();
        let request = MoveRequest::from(request);
        assert_eq!(request.items, ItemSelection::FromSelection);
        assert!(!request.leave_redirect);
    }
}
