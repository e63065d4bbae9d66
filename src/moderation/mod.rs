//! Bulk moderation executors
//!
//! This module turns an actor's request into a batch of side effects:
//! - `core`: batch state machine, report and selection types
//! - `error`: `ModerationError` and its machine-readable kind
//! - `redirect`: stubs left behind by moves
//! - `unit_of_work`: the single funnel for side effects and counter deltas
//! - `relocate`: `Moderator::move_items`
//! - `delete`: `Moderator::delete_items` and `Moderator::delete_comments`
//!
//! Every executor follows the same shape: resolve the working list, check
//! the batch-wide gate, filter per entry by capability, apply through a
//! [`UnitOfWork`], commit once, then consume the selection that drove it.

pub mod core;
pub mod delete;
pub mod error;
pub mod redirect;
pub mod relocate;
pub mod unit_of_work;


use tracing::{debug, warn};

use crate::auth::Authorizer;
use crate::db::{ActivityCache, ActorId, ItemId, ItemStore};
use crate::ledger::AggregateLedger;
use crate::selection::{Scope, SelectionKey, SelectionStore};

pub use self::core::{
    BatchOperation, BatchReport, BatchState, CommentSelection, ItemSelection, ModerationPolicy,
};
pub use error::{ErrorKind, ErrorResponse, ModerationError};
pub use redirect::RedirectGenerator;
pub use relocate::{MoveRequest, RelocationRequest};
pub use unit_of_work::{BatchDelta, NetDelta, UnitOfWork};

type Result<T> = std::result::Result<T, ModerationError>;

/// Everything an executor needs to run a batch for one actor
pub struct Moderator<'a, S: ?Sized, A: ?Sized> {
    store: &'a S,
    ledger: &'a AggregateLedger<'a>,
    selections: SelectionStore<'a>,
    authorizer: &'a A,
    redirects: RedirectGenerator,
    policy: ModerationPolicy,
}

impl<'a, S, A> Moderator<'a, S, A>
where
    S: ItemStore + ActivityCache + ?Sized,
    A: Authorizer + ?Sized,
{
    pub fn new(
        store: &'a S,
        ledger: &'a AggregateLedger<'a>,
        selections: SelectionStore<'a>,
        authorizer: &'a A,
    ) -> Self {
        Self {
            store,
            ledger,
            selections,
            authorizer,
            redirects: RedirectGenerator::default(),
            policy: ModerationPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_redirects(mut self, redirects: RedirectGenerator) -> Self {
        self.redirects = redirects;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ModerationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The working item list; explicit lists are de-duplicated, selection
    /// lists ignore keys that are not discussions
    fn resolve_items(&self, actor: ActorId, items: &ItemSelection) -> Result<Vec<ItemId>> {
        match items {
            ItemSelection::Explicit(ids) => Ok(self::core::dedup_preserving_order(ids)),
            ItemSelection::FromSelection => Ok(self
                .selections
                .get(actor, Scope::Global)?
                .into_iter()
                .filter_map(SelectionKey::item_id)
                .collect()),
        }
    }

    /// Consume a selection after the batch it drove
    ///
    /// A fully committed batch clears the scope; a partial one removes only
    /// what was processed so a re-run picks up the rest.
    fn consume_selection(
        &self,
        actor: ActorId,
        scope: Scope,
        state: BatchState,
        processed: &[SelectionKey],
    ) -> Result<()> {
        if state == BatchState::Committed {
            self.selections.clear(actor, scope)?;
        } else {
            self.selections.remove_keys(actor, scope, processed)?;
        }
        debug!(%actor, ?scope, ?state, processed = processed.len(), "Consumed selection");
        Ok(())
    }

    /// Consume the selection of a batch that is already returning an error;
    /// a failure here is logged so the batch's own error is kept
    fn consume_selection_after_error(
        &self,
        actor: ActorId,
        scope: Scope,
        state: BatchState,
        processed: &[SelectionKey],
    ) {
        if let Err(e) = self.consume_selection(actor, scope, state, processed) {
            warn!(%actor, ?scope, "Failed to consume selection: {e}");
        }
    }
}
