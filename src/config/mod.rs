//! Configuration module for modr
//!
//! Manages application configuration: database paths, the acting user,
//! logging, item schema limits, redirect formatting, move policy and
//! capability grants. Configuration is stored in the user's config directory
//! and any value can be overridden with a `MODR_`-prefixed environment
//! variable (nested keys use `__`, e.g. `MODR_SCHEMA__MAX_TITLE_LENGTH`).

mod setup;

pub use setup::first_time_setup;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::auth::{Capability, Grant, GrantTable};
use crate::db::{ActorId, ItemSchema};
use crate::moderation::redirect::DEFAULT_TITLE_TEMPLATE;
use crate::moderation::{ModerationPolicy, RedirectGenerator};

/// How redirect stubs link to moved items
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RedirectConfig {
    /// Prefix of item URLs, e.g. `https://forum.example`
    pub url_base: String,
    /// Stub title; `{title}` is replaced by the moved item's title
    pub title_template: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            url_base: String::new(),
            title_template: DEFAULT_TITLE_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ModerationConfig {
    /// Capabilities needed on an item's current container to move it
    pub move_requires: Vec<Capability>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            move_requires: ModerationPolicy::default().move_requires,
        }
    }
}

/// Application configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModrConfig {
    /// Map of database names to their filesystem paths
    #[serde(default)]
    pub databases: HashMap<String, PathBuf>,

    /// The default database to use when none is specified
    #[serde(default)]
    pub default_database: Option<String>,

    /// Suppress informational output by default
    #[serde(default)]
    pub quiet: bool,

    /// Acting user when `--actor` is not given
    #[serde(default)]
    pub actor: Option<ActorId>,

    /// Default tracing filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub schema: ItemSchema,

    #[serde(default)]
    pub redirect: RedirectConfig,

    #[serde(default)]
    pub moderation: ModerationConfig,

    #[serde(default)]
    pub grants: Vec<Grant>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ModrConfig {
    fn default() -> Self {
        Self {
            databases: HashMap::new(),
            default_database: None,
            quiet: false,
            actor: None,
            log_level: default_log_level(),
            schema: ItemSchema::default(),
            redirect: RedirectConfig::default(),
            moderation: ModerationConfig::default(),
            grants: Vec::new(),
        }
    }
}

impl ModrConfig {
    /// Get the path to the config file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the system config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::Message("Could not determine config directory".to_string()))?;

        Ok(config_dir.join("modr").join("config.toml"))
    }

    /// Load configuration from file, creating default if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file cannot be read, parsed, or created.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing the default there if missing
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or created.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let default_config = Self::default();
            default_config.save_to(path)?;
            return Ok(default_config);
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix("MODR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config directory cannot be created, the configuration
    /// cannot be serialized to TOML, or the file cannot be written.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the directory cannot be created or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Message(format!("Failed to create config directory: {e}")))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::Message(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Add a database to the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if saving the configuration fails.
    pub fn add_database(&mut self, name: String, path: PathBuf) -> Result<(), ConfigError> {
        self.databases.insert(name, path);
        self.save()
    }

    /// Remove a database from the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if saving the configuration fails.
    pub fn remove_database(&mut self, name: &str) -> Result<Option<PathBuf>, ConfigError> {
        let removed = self.databases.remove(name);
        if self.default_database.as_deref() == Some(name) {
            self.default_database = None;
        }
        self.save()?;
        Ok(removed)
    }

    /// Get a database path by name
    #[must_use]
    pub fn get_database(&self, name: &str) -> Option<&PathBuf> {
        self.databases.get(name)
    }

    /// List all database names, sorted
    #[must_use]
    pub fn list_databases(&self) -> Vec<&String> {
        let mut names: Vec<_> = self.databases.keys().collect();
        names.sort();
        names
    }

    /// Set the default database
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the database name doesn't exist in the configuration
    /// or if saving the configuration fails.
    pub fn set_default_database(&mut self, name: String) -> Result<(), ConfigError> {
        if !self.databases.contains_key(&name) {
            return Err(ConfigError::Message(format!(
                "Database '{name}' does not exist in configuration"
            )));
        }
        self.default_database = Some(name);
        self.save()
    }

    /// Get the default database name
    #[must_use]
    pub const fn get_default_database(&self) -> Option<&String> {
        self.default_database.as_ref()
    }

    /// Load configuration, running first-time setup if config doesn't exist
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if loading or creating the configuration fails.
    pub fn load_or_setup() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load()
        } else {
            first_time_setup()
        }
    }

    #[must_use]
    pub fn grant_table(&self) -> GrantTable {
        GrantTable::from_grants(&self.grants)
    }

    #[must_use]
    pub fn redirect_generator(&self) -> RedirectGenerator {
        RedirectGenerator::new(&self.redirect.url_base, &self.redirect.title_template)
    }

    #[must_use]
    pub fn moderation_policy(&self) -> ModerationPolicy {
        ModerationPolicy {
            move_requires: self.moderation.move_requires.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Authorizer;
    use crate::db::ContainerId;

    #[test]
    fn test_default_config() {
        let config = ModrConfig::default();
        assert!(config.databases.is_empty());
        assert!(config.default_database.is_none());
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.schema.max_title_length, 100);
        assert_eq!(config.schema.max_body_length, 65_535);
        assert_eq!(
            config.moderation.move_requires,
            vec![Capability::Edit, Capability::Delete]
        );
        assert!(config.grant_table().is_empty());
    }

    #[test]
    fn test_add_database() {
        let mut config = ModrConfig::default();
        config.databases.insert("test_db".to_string(), PathBuf::from("/tmp/test_db"));

        assert_eq!(config.databases.len(), 1);
        assert_eq!(config.get_database("test_db"), Some(&PathBuf::from("/tmp/test_db")));
    }

    #[test]
    fn test_list_databases_sorted() {
        let mut config = ModrConfig::default();
        for name in ["gamma", "alpha", "beta"] {
            config.databases.insert(name.to_string(), PathBuf::from(format!("/tmp/{name}")));
        }

        let names = config.list_databases();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ModrConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert!(config.databases.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ModrConfig::default();
        config.databases.insert("forum".into(), PathBuf::from("/srv/forum"));
        config.default_database = Some("forum".into());
        config.actor = Some(ActorId::new(7));
        config.grants.push(Grant {
            actor: ActorId::new(7),
            container: None,
            capabilities: Capability::ALL.to_vec(),
        });
        config.save_to(&path).unwrap();

        let loaded = ModrConfig::load_from(&path).unwrap();
        assert_eq!(loaded.get_default_database(), Some(&"forum".to_string()));
        assert_eq!(loaded.actor, Some(ActorId::new(7)));
        assert!(loaded
            .grant_table()
            .has_capability(ActorId::new(7), ContainerId::new(1), Capability::Delete));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
quiet = true

[schema]
max_title_length = 40

[redirect]
url_base = "https://forum.example/"

[moderation]
move_requires = ["edit"]

[[grants]]
actor = 3
container = 12
capabilities = ["add"]
"#,
        )
        .unwrap();

        let config = ModrConfig::load_from(&path).unwrap();
        assert!(config.quiet);
        assert_eq!(config.schema.max_title_length, 40);
        assert_eq!(config.schema.max_body_length, 65_535);
        assert_eq!(config.redirect.title_template, DEFAULT_TITLE_TEMPLATE);
        assert_eq!(config.moderation_policy().move_requires, vec![Capability::Edit]);
        assert!(config
            .grant_table()
            .has_capability(ActorId::new(3), ContainerId::new(12), Capability::Add));
    }
}
