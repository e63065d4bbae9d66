//! Output formatting for CLI display
//!
//! This module provides the line formats used by the commands and the JSON
//! rendering shared by `--json` mode.

use colored::Colorize;
use serde::Serialize;

use crate::db::{CommentRecord, ContainerRecord, ItemKind, ItemRecord};
use crate::ledger::ContainerCounts;
use crate::moderation::{BatchReport, ErrorResponse, ModerationError};

/// Format a container as a tree line with its counters
#[must_use]
pub fn container_line(record: &ContainerRecord, counts: &ContainerCounts, depth: usize, quiet: bool) -> String {
    if quiet {
        return format!("{}\t{}", record.id, record.name);
    }
    let indent = "  ".repeat(depth + 1);
    format!(
        "{indent}{} {} {}",
        format!("[{}]", record.id).dimmed(),
        record.name.bold(),
        format!(
            "(items {}/{}, comments {}/{})",
            counts.own.items, counts.aggregate.items, counts.own.nested, counts.aggregate.nested
        )
        .cyan()
    )
}

/// Format a discussion or redirect stub
#[must_use]
pub fn item_line(record: &ItemRecord, quiet: bool) -> String {
    if quiet {
        return format!("{}\t{}", record.id, record.title);
    }
    let marker = match record.kind {
        ItemKind::Discussion => String::new(),
        ItemKind::Redirect => format!(" {}", "(redirect)".yellow()),
    };
    let closed = if record.closed {
        format!(" {}", "(closed)".red())
    } else {
        String::new()
    };
    format!(
        "  {} {}{marker}{closed} {}",
        format!("[{}]", record.id).dimmed(),
        record.title,
        format!("{} comment(s)", record.nested_count).cyan()
    )
}

#[must_use]
pub fn comment_line(record: &CommentRecord, quiet: bool) -> String {
    if quiet {
        return format!("{}\t{}", record.id, record.body);
    }
    format!(
        "  {} {} {}",
        format!("[{}]", record.id).dimmed(),
        record.body,
        record.inserted_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
    )
}

/// Render any serializable value as pretty JSON
///
/// # Errors
/// Returns an I/O error if serialization fails.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> std::io::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Print a batch report as JSON or as the coloured summary
///
/// # Errors
/// Returns an I/O error if JSON serialization fails.
pub fn print_report(report: &BatchReport, json: bool, quiet: bool) -> std::io::Result<()> {
    if json {
        println!("{}", to_json(report)?);
    } else if !quiet {
        report.print();
    }
    Ok(())
}

/// Print a failed batch as an [`ErrorResponse`]
///
/// # Errors
/// Returns an I/O error if JSON serialization fails.
pub fn print_error_json(err: &ModerationError) -> std::io::Result<()> {
    println!("{}", to_json(&ErrorResponse::from(err))?);
    Ok(())
}
