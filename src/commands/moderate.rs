//! Bulk moderation commands: move, delete, delete-comments

use dialoguer::Confirm;

use super::{OutputMode, ids};
use crate::ModrError;
use crate::auth::Authorizer;
use crate::cli::{DeleteArgs, DeleteCommentsArgs, InputArgs, MoveArgs};
use crate::db::{ActivityCache, ActorId, CommentId, ContainerId, ItemId, ItemStore};
use crate::moderation::{BatchReport, CommentSelection, ItemSelection, ModerationError, Moderator, MoveRequest};
use crate::output;
use crate::selection::{Scope, SelectionStore};

type Result<T> = std::result::Result<T, ModrError>;

/// Ids given on the command line or in a file, else the actor's selection
fn item_selection(ids: &[u64], input: &InputArgs) -> Result<ItemSelection> {
    if input.uses_selection(ids) {
        return Ok(ItemSelection::FromSelection);
    }
    let ids = ids::collect(ids, input)?;
    Ok(ItemSelection::Explicit(ids.into_iter().map(ItemId::new).collect()))
}

fn comment_selection(ids: &[u64], input: &InputArgs) -> Result<CommentSelection> {
    if input.uses_selection(ids) {
        return Ok(CommentSelection::FromSelection);
    }
    let ids = ids::collect(ids, input)?;
    Ok(CommentSelection::Explicit(ids.into_iter().map(CommentId::new).collect()))
}

/// How many entries the batch will look at
fn pending_count(selections: &SelectionStore<'_>, actor: ActorId, scope: Scope, explicit: Option<usize>) -> Result<usize> {
    match explicit {
        Some(n) => Ok(n),
        None => Ok(selections.get(actor, scope)?.len()),
    }
}

fn confirm(prompt: String) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| ModrError::InvalidInput(format!("Failed to get confirmation: {e}")))
}

fn report_outcome(result: std::result::Result<BatchReport, ModerationError>, mode: OutputMode) -> Result<()> {
    match result {
        Ok(report) => {
            output::print_report(&report, mode.json, mode.quiet)?;
            Ok(())
        }
        Err(err) => {
            if mode.json {
                output::print_error_json(&err)?;
            } else if let Some(report) = err.report() {
                report.print();
            }
            Err(err.into())
        }
    }
}

/// # Errors
/// Returns `ModrError` if the id list cannot be read or the batch fails.
pub fn move_items<S, A>(
    moderator: &Moderator<'_, S, A>,
    selections: &SelectionStore<'_>,
    actor: ActorId,
    args: &MoveArgs,
    mode: OutputMode,
) -> Result<()>
where
    S: ItemStore + ActivityCache + ?Sized,
    A: Authorizer + ?Sized,
{
    let items = item_selection(&args.ids, &args.input)?;
    let explicit = match &items {
        ItemSelection::Explicit(ids) => Some(ids.len()),
        ItemSelection::FromSelection => None,
    };
    let count = pending_count(selections, actor, Scope::Global, explicit)?;
    if count == 0 {
        if !mode.quiet {
            println!("No discussions to move.");
        }
        return Ok(());
    }
    if !args.yes {
        let redirect = if args.redirect { " leaving redirects" } else { "" };
        if !confirm(format!("Move {count} discussion(s) to container {}{redirect}?", args.to))? {
            println!("Operation cancelled.");
            return Ok(());
        }
    }

    let request = MoveRequest {
        items,
        destination: ContainerId::new(args.to),
        leave_redirect: args.redirect,
    };
    report_outcome(moderator.move_items(actor, &request), mode)
}

/// # Errors
/// Returns `ModrError` if the id list cannot be read or the batch fails.
pub fn delete_items<S, A>(
    moderator: &Moderator<'_, S, A>,
    selections: &SelectionStore<'_>,
    actor: ActorId,
    args: &DeleteArgs,
    mode: OutputMode,
) -> Result<()>
where
    S: ItemStore + ActivityCache + ?Sized,
    A: Authorizer + ?Sized,
{
    let items = item_selection(&args.ids, &args.input)?;
    let explicit = match &items {
        ItemSelection::Explicit(ids) => Some(ids.len()),
        ItemSelection::FromSelection => None,
    };
    let count = pending_count(selections, actor, Scope::Global, explicit)?;
    if count == 0 {
        if !mode.quiet {
            println!("No discussions to delete.");
        }
        return Ok(());
    }
    if !args.yes && !confirm(format!("Delete {count} discussion(s) and their comments?"))? {
        println!("Operation cancelled.");
        return Ok(());
    }

    report_outcome(moderator.delete_items(actor, &items), mode)
}

/// # Errors
/// Returns `ModrError` if the id list cannot be read or the batch fails.
pub fn delete_comments<S, A>(
    moderator: &Moderator<'_, S, A>,
    selections: &SelectionStore<'_>,
    actor: ActorId,
    args: &DeleteCommentsArgs,
    mode: OutputMode,
) -> Result<()>
where
    S: ItemStore + ActivityCache + ?Sized,
    A: Authorizer + ?Sized,
{
    let discussion = ItemId::new(args.discussion);
    let comments = comment_selection(&args.ids, &args.input)?;
    let explicit = match &comments {
        CommentSelection::Explicit(ids) => Some(ids.len()),
        CommentSelection::FromSelection => None,
    };
    let count = pending_count(selections, actor, Scope::Parent(discussion), explicit)?;
    if count == 0 {
        if !mode.quiet {
            println!("No comments to delete.");
        }
        return Ok(());
    }
    if !args.yes && !confirm(format!("Delete {count} comment(s) from discussion {discussion}?"))? {
        println!("Operation cancelled.");
        return Ok(());
    }

    report_outcome(moderator.delete_comments(actor, discussion, &comments), mode)
}
