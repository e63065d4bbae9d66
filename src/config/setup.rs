//! Interactive setup wizard for first-time configuration
//!
//! This module handles the interactive prompts for creating an initial
//! configuration when modr is run for the first time.

use super::ModrConfig;
use crate::auth::{Capability, Grant};
use crate::db::ActorId;
use config::ConfigError;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::path::PathBuf;

/// Interactive first-time setup - prompts for database and acting moderator
///
/// Guides the user through creating their first configuration:
/// 1. Prompts for a database name (default: "default")
/// 2. Prompts for database location (default: system data directory)
/// 3. Prompts for the moderator id used when `--actor` is omitted
/// 4. Optionally grants that moderator every capability everywhere
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - The system data directory cannot be determined
/// - User input cannot be read
/// - The configuration cannot be saved
pub fn first_time_setup() -> Result<ModrConfig, ConfigError> {
    println!("Welcome to modr! Let's set up your first database.\n");

    let default_data_dir = dirs::data_local_dir()
        .ok_or_else(|| ConfigError::Message("Could not determine data directory".to_string()))?
        .join("modr");
    let theme = ColorfulTheme::default();
    let input_error = |e: dialoguer::Error| ConfigError::Message(format!("Failed to read input: {e}"));

    let db_name: String = Input::with_theme(&theme)
        .with_prompt("Database name")
        .default("default".to_string())
        .interact_text()
        .map_err(input_error)?;

    let default_path = default_data_dir.join(&db_name);
    let db_path_str: String = Input::with_theme(&theme)
        .with_prompt("Database location")
        .default(default_path.to_string_lossy().to_string())
        .interact_text()
        .map_err(input_error)?;

    let actor: u64 = Input::with_theme(&theme)
        .with_prompt("Your moderator id")
        .default(1)
        .interact_text()
        .map_err(input_error)?;
    let actor = ActorId::new(actor);

    let grant_all = Confirm::with_theme(&theme)
        .with_prompt("Grant this moderator add/edit/delete on every container?")
        .default(true)
        .interact()
        .map_err(input_error)?;

    let mut config = ModrConfig::default();
    config.databases.insert(db_name.clone(), PathBuf::from(db_path_str));
    config.default_database = Some(db_name);
    config.actor = Some(actor);
    if grant_all {
        config.grants.push(Grant {
            actor,
            container: None,
            capabilities: Capability::ALL.to_vec(),
        });
    }

    config.save()?;

    println!("\nConfiguration saved successfully!");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_signature() {
        let _: fn() -> Result<ModrConfig, ConfigError> = first_time_setup;
    }
}
