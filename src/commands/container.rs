//! Container hierarchy commands

use colored::Colorize;
use serde::Serialize;

use super::OutputMode;
use crate::ModrError;
use crate::cli::ContainerCommands;
use crate::db::{ContainerId, ContainerRecord, Database};
use crate::ledger::{AggregateLedger, ContainerCounts};
use crate::output;

type Result<T> = std::result::Result<T, ModrError>;

#[derive(Serialize)]
struct ContainerEntry {
    #[serde(flatten)]
    record: ContainerRecord,
    depth: usize,
    counts: ContainerCounts,
}

/// # Errors
/// Returns `ModrError` if storage fails or a container id is unknown.
pub fn execute(
    db: &Database,
    ledger: &AggregateLedger<'_>,
    command: &ContainerCommands,
    mode: OutputMode,
) -> Result<()> {
    match command {
        ContainerCommands::Add { name, parent } => {
            let id = db.create_container(name, parent.map(ContainerId::new))?;
            if mode.quiet {
                println!("{id}");
            } else {
                println!("{} container '{}' [{}]", "✓ Created".green(), name, id);
            }
        }
        ContainerCommands::List => list(db, ledger, mode)?,
        ContainerCommands::Refresh { container } => {
            match container {
                Some(id) => ledger.refresh(ContainerId::new(*id), db)?,
                None => ledger.refresh_all(db)?,
            }
            if !mode.quiet {
                println!("{}", "✓ Counters recomputed from storage".green());
            }
        }
        ContainerCommands::Verify => {
            let problems = ledger.verify()?;
            if mode.json {
                println!("{}", output::to_json(&problems)?);
            } else if problems.is_empty() {
                if !mode.quiet {
                    println!("{}", "✓ All aggregate counters are consistent".green());
                }
            } else {
                for p in &problems {
                    println!(
                        "  {} container {} {}: stored {}, expected {}",
                        "✗".red(),
                        p.container,
                        p.kind,
                        p.stored,
                        p.expected
                    );
                }
                if !mode.quiet {
                    println!("Run 'modr container refresh' to repair.");
                }
            }
        }
    }
    Ok(())
}

fn list(db: &Database, ledger: &AggregateLedger<'_>, mode: OutputMode) -> Result<()> {
    let index = ledger.index();
    let mut entries = Vec::with_capacity(index.len());
    let mut stack: Vec<ContainerId> = index.roots().into_iter().rev().collect();
    while let Some(id) = stack.pop() {
        stack.extend(index.children(id).into_iter().rev());
        if let Some(record) = db.get_container(id)? {
            entries.push(ContainerEntry {
                record,
                depth: index.depth(id),
                counts: ledger.counts(id)?,
            });
        }
    }

    if mode.json {
        println!("{}", output::to_json(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        if !mode.quiet {
            println!("No containers yet. Create one with: modr container add <name>");
        }
        return Ok(());
    }
    if !mode.quiet {
        println!("Containers (own/aggregate):");
    }
    for entry in &entries {
        println!(
            "{}",
            output::container_line(&entry.record, &entry.counts, entry.depth, mode.quiet)
        );
    }
    Ok(())
}
