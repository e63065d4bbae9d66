//! Selection commands: check, uncheck, show, clear

use colored::Colorize;
use serde_json::json;

use super::OutputMode;
use crate::ModrError;
use crate::cli::SelectCommands;
use crate::db::{ActorId, ItemId};
use crate::output;
use crate::selection::{CheckToggle, Scope, SelectionStore};

type Result<T> = std::result::Result<T, ModrError>;

fn scope_for(discussion: Option<u64>) -> Scope {
    discussion.map_or(Scope::Global, |id| Scope::Parent(ItemId::new(id)))
}

fn toggles(keys: &[String], checked: bool) -> Vec<CheckToggle> {
    keys.iter()
        .map(|key| CheckToggle {
            check_id: key.clone(),
            checked,
        })
        .collect()
}

/// # Errors
/// Returns `ModrError` for a malformed key or a storage failure.
pub fn execute(
    selections: &SelectionStore<'_>,
    actor: ActorId,
    command: &SelectCommands,
    mode: OutputMode,
) -> Result<()> {
    match command {
        SelectCommands::Check { keys, discussion } | SelectCommands::Uncheck { keys, discussion } => {
            let checked = matches!(command, SelectCommands::Check { .. });
            let remaining = selections.toggle_many(actor, scope_for(*discussion), &toggles(keys, checked))?;
            if mode.json {
                println!("{}", json!({ "selected": remaining }));
            } else if !mode.quiet {
                let verb = if checked { "Checked" } else { "Unchecked" };
                println!("{} {} key(s); {} selected", format!("✓ {verb}").green(), keys.len(), remaining);
            }
        }
        SelectCommands::Show { discussion: Some(id) } => {
            let keys = selections.get(actor, Scope::Parent(ItemId::new(*id)))?;
            if mode.json {
                println!("{}", output::to_json(&keys)?);
            } else {
                for key in &keys {
                    println!("{key}");
                }
                if keys.is_empty() && !mode.quiet {
                    println!("Nothing selected in discussion {id}.");
                }
            }
        }
        SelectCommands::Show { discussion: None } => {
            let keys = selections.get(actor, Scope::Global)?;
            let summary = selections.summary(actor)?;
            if mode.json {
                println!("{}", json!({ "discussions": keys, "summary": summary }));
                return Ok(());
            }
            for key in &keys {
                println!("{key}");
            }
            if mode.quiet {
                return Ok(());
            }
            if summary.is_empty() {
                println!("Nothing selected.");
            }
            for (discussion, count) in &summary.comments {
                println!("  {} comment(s) selected in discussion {}", count.to_string().cyan(), discussion);
            }
        }
        SelectCommands::Clear { discussion, all } => {
            let removed = if *all {
                selections.clear_all(actor)?
            } else {
                usize::from(selections.clear(actor, scope_for(*discussion))?)
            };
            if mode.json {
                println!("{}", json!({ "cleared": removed }));
            } else if !mode.quiet {
                println!("{} {} selection(s)", "✓ Cleared".green(), removed);
            }
        }
    }
    Ok(())
}
