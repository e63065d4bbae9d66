//! Database management: add, list, remove, set-default

use std::path::{Path, PathBuf};

use crate::ModrError;
use crate::cli::DbCommands;
use crate::config::ModrConfig;

type Result<T> = std::result::Result<T, ModrError>;

/// Resolve a database location; bare names live under the data directory
fn resolve_path(name: &str, path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) if path.components().count() > 1 => Ok(path.to_path_buf()),
        other => {
            let data_dir = dirs::data_local_dir()
                .ok_or_else(|| ModrError::InvalidInput("Could not determine data directory".into()))?;
            let leaf = other.map_or_else(|| PathBuf::from(name), Path::to_path_buf);
            Ok(data_dir.join("modr").join(leaf))
        }
    }
}

/// # Errors
/// Returns `ModrError` if the named database does (or does not) exist as
/// required, or the configuration cannot be saved.
pub fn execute(config: &mut ModrConfig, command: &DbCommands, quiet: bool) -> Result<()> {
    match command {
        DbCommands::Add { name, path } => {
            if config.get_database(name).is_some() {
                return Err(ModrError::InvalidInput(format!("Database '{name}' already exists")));
            }

            let resolved_path = resolve_path(name, path.as_deref())?;
            config.add_database(name.clone(), resolved_path.clone())?;

            if !resolved_path.exists() {
                std::fs::create_dir_all(&resolved_path)?;
            }

            if !quiet {
                println!("Database '{name}' added at {}", resolved_path.display());
            }

            if config.databases.len() == 1 {
                config.set_default_database(name.clone())?;
                if !quiet {
                    println!("Set '{name}' as default database");
                }
            }
        }
        DbCommands::List => {
            if config.databases.is_empty() {
                if !quiet {
                    println!("No databases configured.");
                    println!("Add one with: modr db add <name> [path]");
                }
                return Ok(());
            }

            if !quiet {
                println!("Configured databases:");
            }

            let default_db = config.get_default_database();
            for name in config.list_databases() {
                if let Some(path) = config.get_database(name) {
                    if quiet {
                        println!("{name}");
                    } else {
                        let marker = if default_db == Some(name) { " (default)" } else { "" };
                        println!("  {} -> {}{}", name, path.display(), marker);
                    }
                }
            }
        }
        DbCommands::Remove { name, delete_files } => {
            if config.get_database(name).is_none() {
                return Err(ModrError::InvalidInput(format!("Database '{name}' does not exist")));
            }

            let is_default = config.get_default_database() == Some(name);
            if is_default && !quiet {
                println!("Warning: Removing the default database. You'll need to set a new default.");
            }

            if let Some(path) = config.remove_database(name)? {
                if !quiet {
                    println!("Database '{name}' removed from configuration");
                }

                if *delete_files {
                    if path.exists() {
                        match std::fs::remove_dir_all(&path) {
                            Ok(()) => {
                                if !quiet {
                                    println!("Database files deleted from {}", path.display());
                                }
                            }
                            Err(e) => eprintln!("Warning: Failed to delete database files: {e}"),
                        }
                    } else if !quiet {
                        println!("Database files at {} do not exist (already deleted)", path.display());
                    }
                } else if !quiet {
                    println!("Note: Database files at {} were NOT deleted", path.display());
                }
            }
        }
        DbCommands::SetDefault { name } => {
            config.set_default_database(name.clone())?;
            if !quiet {
                println!("Default database set to '{name}'");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_paths_kept() {
        let path = resolve_path("forum", Some(Path::new("/srv/forum"))).unwrap();
        assert_eq!(path, PathBuf::from("/srv/forum"));
    }

    #[test]
    fn test_bare_names_resolve_under_data_dir() {
        let Some(data_dir) = dirs::data_local_dir() else {
            return;
        };
        let path = resolve_path("forum", None).unwrap();
        assert_eq!(path, data_dir.join("modr").join("forum"));
        let path = resolve_path("forum", Some(Path::new("archive"))).unwrap();
        assert_eq!(path, data_dir.join("modr").join("archive"));
    }
}
