use tracing::{debug, info, warn};

use super::core::{BatchOperation, BatchReport, BatchState, CommentSelection, ItemSelection};
use super::error::ModerationError;
use super::unit_of_work::UnitOfWork;
use super::{Moderator, Result};
use crate::auth::{Authorizer, Capability};
use crate::db::{ActivityCache, ActorId, ItemId, ItemStore};
use crate::selection::{Scope, SelectionKey};

impl<S, A> Moderator<'_, S, A>
where
    S: ItemStore + ActivityCache + ?Sized,
    A: Authorizer + ?Sized,
{
    /// Delete items the actor may delete
    ///
    /// Each item is deleted independently: a failure is counted in
    /// `failed` and the batch carries on, ending `PartiallyApplied`.
    ///
    /// # Errors
    /// Returns `ModerationError` on selection or lookup failures, and
    /// `Interrupted` with the partial report when the counter commit fails.
    pub fn delete_items(&self, actor: ActorId, items: &ItemSelection) -> Result<BatchReport> {
        let mut report = BatchReport::new(BatchOperation::Delete);
        let ids = self.resolve_items(actor, items)?;
        // no destination to check
        report.transition(BatchState::DestinationChecked);

        report.transition(BatchState::Filtering);
        report.total_checked = ids.len();
        let mut allowed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get_item(id)? {
                Some(item)
                    if self
                        .authorizer
                        .has_capability(actor, item.container, Capability::Delete) =>
                {
                    allowed.push(item);
                }
                Some(item) => debug!(item = %id, container = %item.container, "Delete not allowed"),
                None => debug!(item = %id, "Delete skipped: item not found"),
            }
        }
        report.allowed = allowed.len();
        report.not_allowed = report.total_checked - report.allowed;

        report.transition(BatchState::Applying);
        let mut uow = UnitOfWork::new(self.store, self.ledger);
        let mut deleted_keys = Vec::new();
        for item in &allowed {
            match uow.delete_item(item) {
                Ok(true) => {
                    report.processed += 1;
                    deleted_keys.push(SelectionKey::discussion(item.id));
                }
                Ok(false) => {
                    report.failed += 1;
                    warn!(item = %item.id, "Item vanished before deletion");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(item = %item.id, "Failed to delete item: {e}");
                }
            }
        }

        let scope = (*items == ItemSelection::FromSelection).then_some(Scope::Global);
        self.commit_deletions(actor, uow, &mut report, scope, &deleted_keys)?;
        info!(%actor, deleted = report.processed, failed = report.failed, "Delete batch finished");
        Ok(report)
    }

    /// Delete comments inside one discussion
    ///
    /// The actor needs `Delete` on the discussion's container for the whole
    /// batch. Comments that do not exist or belong to another discussion
    /// are counted as not allowed.
    ///
    /// # Errors
    /// Returns `ModerationError::NotFound` for an unknown discussion,
    /// `ModerationError::Forbidden` without the capability, a storage error,
    /// or `Interrupted` with the partial report when the counter commit fails.
    pub fn delete_comments(
        &self,
        actor: ActorId,
        discussion: ItemId,
        comments: &CommentSelection,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::new(BatchOperation::DeleteComments);
        let parent = self
            .store
            .get_item(discussion)?
            .ok_or_else(|| ModerationError::NotFound(format!("item {discussion}")))?;
        let container = parent.container;

        if !self
            .authorizer
            .has_capability(actor, container, Capability::Delete)
        {
            report.transition(BatchState::Rejected);
            warn!(%actor, %discussion, "Comment delete rejected: no delete capability");
            return Err(ModerationError::Forbidden {
                actor,
                container,
                capability: Capability::Delete,
            });
        }
        report.transition(BatchState::DestinationChecked);

        let scope = Scope::Parent(discussion);
        let ids = match comments {
            CommentSelection::Explicit(ids) => super::core::dedup_preserving_order(ids),
            CommentSelection::FromSelection => self
                .selections
                .get(actor, scope)?
                .into_iter()
                .filter_map(SelectionKey::comment_id)
                .collect(),
        };

        report.transition(BatchState::Filtering);
        report.total_checked = ids.len();
        let mut allowed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get_comment(id)? {
                Some(comment) if comment.item == discussion => allowed.push(comment.id),
                Some(comment) => debug!(comment = %id, item = %comment.item, "Comment belongs elsewhere"),
                None => debug!(comment = %id, "Comment not found"),
            }
        }
        report.allowed = allowed.len();
        report.not_allowed = report.total_checked - report.allowed;

        report.transition(BatchState::Applying);
        let mut uow = UnitOfWork::new(self.store, self.ledger);
        let mut deleted_keys = Vec::new();
        for id in allowed {
            match uow.delete_comment(id, container) {
                Ok(true) => {
                    report.processed += 1;
                    deleted_keys.push(SelectionKey::comment(id));
                }
                Ok(false) => report.failed += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(comment = %id, "Failed to delete comment: {e}");
                }
            }
        }

        let scope = (*comments == CommentSelection::FromSelection).then_some(scope);
        self.commit_deletions(actor, uow, &mut report, scope, &deleted_keys)?;
        info!(%actor, %discussion, deleted = report.processed, "Comment delete batch finished");
        Ok(report)
    }

    /// Commit a deletion batch and consume the selection that drove it
    ///
    /// Deletions already happened when this runs, so a failed commit closes
    /// the report as partially applied and hands it back in the error.
    fn commit_deletions(
        &self,
        actor: ActorId,
        uow: UnitOfWork<'_, S>,
        report: &mut BatchReport,
        scope: Option<Scope>,
        deleted_keys: &[SelectionKey],
    ) -> Result<()> {
        report.affected_containers = uow.delta().containers();
        let source = match uow.commit() {
            Ok(touched) => {
                report.affected_containers = touched;
                None
            }
            Err(e) => Some(e),
        };
        if source.is_none() && report.failed == 0 {
            report.transition(BatchState::Committed);
        } else {
            warn!(failed = report.failed, "Batch partially applied");
            report.transition(BatchState::PartiallyApplied);
        }

        match source {
            None => {
                if let Some(scope) = scope {
                    self.consume_selection(actor, scope, report.state, deleted_keys)?;
                }
                Ok(())
            }
            Some(source) => {
                if let Some(scope) = scope {
                    self.consume_selection_after_error(actor, scope, report.state, deleted_keys);
                }
                warn!(%actor, deleted = report.processed, "Delete batch interrupted: {source}");
                Err(ModerationError::Interrupted {
                    source,
                    report: Box::new(report.clone()),
                })
            }
        }
    }
}

