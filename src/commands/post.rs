//! Posting and listing discussions and comments

use colored::Colorize;

use super::OutputMode;
use crate::ModrError;
use crate::cli::{CommentCommands, ItemCommands};
use crate::content::{post_comment, post_item};
use crate::db::{ContainerId, Database, ItemId, NewItem};
use crate::ledger::AggregateLedger;
use crate::output;

type Result<T> = std::result::Result<T, ModrError>;

/// # Errors
/// Returns `ModrError` if the item fails validation or storage fails.
pub fn items(db: &Database, ledger: &AggregateLedger<'_>, command: &ItemCommands, mode: OutputMode) -> Result<()> {
    match command {
        ItemCommands::Add { container, title, body } => {
            let item = NewItem::discussion(ContainerId::new(*container), title.as_str(), body.as_str());
            let id = post_item(db, ledger, item)?;
            if mode.quiet {
                println!("{id}");
            } else {
                println!("{} discussion [{}] in container {}", "✓ Posted".green(), id, container);
            }
        }
        ItemCommands::List { container } => {
            let items = db.list_items(ContainerId::new(*container))?;
            if mode.json {
                println!("{}", output::to_json(&items)?);
            } else if items.is_empty() {
                if !mode.quiet {
                    println!("No discussions in container {container}.");
                }
            } else {
                for item in &items {
                    println!("{}", output::item_line(item, mode.quiet));
                }
            }
        }
    }
    Ok(())
}

/// # Errors
/// Returns `ModrError` if the discussion is missing or closed.
pub fn comments(
    db: &Database,
    ledger: &AggregateLedger<'_>,
    command: &CommentCommands,
    mode: OutputMode,
) -> Result<()> {
    match command {
        CommentCommands::Add { item, body } => {
            let id = post_comment(db, ledger, ItemId::new(*item), body)?;
            if mode.quiet {
                println!("{id}");
            } else {
                println!("{} comment [{}] on discussion {}", "✓ Posted".green(), id, item);
            }
        }
        CommentCommands::List { item } => {
            let comments = db.list_comments(ItemId::new(*item))?;
            if mode.json {
                println!("{}", output::to_json(&comments)?);
            } else if comments.is_empty() {
                if !mode.quiet {
                    println!("No comments on discussion {item}.");
                }
            } else {
                for comment in &comments {
                    println!("{}", output::comment_line(comment, mode.quiet));
                }
            }
        }
    }
    Ok(())
}
