//! Command-line interface definitions and parsing
//!
//! This module defines the complete CLI structure for modr using the `clap` crate.
//!
//! # Commands
//!
//! - **db**: Manage multiple databases (add, remove, list, set-default)
//! - **container**: Build the hierarchy and inspect its counters
//! - **item** / **comment**: Post content through the ledger
//! - **select**: Check and uncheck discussions or comments
//! - **move**, **delete**, **delete-comments**: Bulk moderation
//!
//! Bulk commands take ids as arguments, from a file (`--input`), or from the
//! acting moderator's selection when neither is given.
//!
//! # Examples
//!
//! ```
//! use modr::cli::{Cli, Commands};
//! use clap::Parser;
//!
//! let cli = Cli::parse_from(["modr", "move", "4", "5", "--to", "2", "--redirect"]);
//! assert!(matches!(cli.command, Commands::Move(_)));
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Format of an id list read with `--input`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdFormat {
    /// One id per line, `#` starts a comment
    #[default]
    Text,
    /// Ids in the first column
    Csv,
    /// A JSON array of ids
    Json,
}

/// Main CLI structure for parsing command-line arguments
#[derive(Parser, Debug)]
#[command(name = "modr")]
#[command(about = "Bulk moderation for hierarchical forums", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress informational output (only print results)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Database name to use (overrides default)
    #[arg(long = "db", value_name = "NAME", global = true)]
    pub db: Option<String>,

    /// Acting moderator id (overrides config)
    #[arg(short = 'a', long = "actor", value_name = "ID", global = true)]
    pub actor: Option<u64>,

    /// Print reports and errors as JSON
    #[arg(long = "json", global = true)]
    pub json: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage databases
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Manage the container hierarchy
    #[command(visible_alias = "c")]
    Container {
        #[command(subcommand)]
        command: ContainerCommands,
    },

    /// Post and list discussions
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Post and list comments
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Manage your selection
    #[command(visible_alias = "sel")]
    Select {
        #[command(subcommand)]
        command: SelectCommands,
    },

    /// Move discussions to another container
    #[command(visible_alias = "mv")]
    Move(MoveArgs),

    /// Delete discussions
    Delete(DeleteArgs),

    /// Delete comments from one discussion
    #[command(name = "delete-comments")]
    DeleteComments(DeleteCommentsArgs),
}

/// Database management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum DbCommands {
    /// Add a new database
    Add {
        /// Name of the database
        name: String,

        /// Path to the database directory (defaults to the data directory)
        path: Option<PathBuf>,
    },

    /// List all databases
    List,

    /// Remove a database from configuration
    #[command(visible_alias = "rm")]
    Remove {
        /// Name of the database to remove
        name: String,

        /// Also delete database files from disk
        #[arg(short = 'd', long = "delete-files")]
        delete_files: bool,
    },

    /// Set the default database
    #[command(name = "set-default")]
    SetDefault {
        /// Name of the database to set as default
        name: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ContainerCommands {
    /// Create a container
    Add {
        name: String,

        /// Parent container id (omit for a root)
        #[arg(short = 'p', long = "parent", value_name = "ID")]
        parent: Option<u64>,
    },

    /// Show the hierarchy with its counters
    #[command(visible_alias = "ls")]
    List,

    /// Recount a subtree from storage (every root when omitted)
    Refresh {
        #[arg(value_name = "ID")]
        container: Option<u64>,
    },

    /// Report counters that disagree with their children
    Verify,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ItemCommands {
    /// Post a discussion
    Add {
        #[arg(short = 'c', long = "container", value_name = "ID")]
        container: u64,

        #[arg(short = 't', long = "title")]
        title: String,

        #[arg(short = 'b', long = "body", default_value = "")]
        body: String,
    },

    /// List discussions in a container
    #[command(visible_alias = "ls")]
    List {
        #[arg(short = 'c', long = "container", value_name = "ID")]
        container: u64,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CommentCommands {
    /// Comment on a discussion
    Add {
        #[arg(value_name = "DISCUSSION")]
        item: u64,

        body: String,
    },

    /// List comments of a discussion
    #[command(visible_alias = "ls")]
    List {
        #[arg(value_name = "DISCUSSION")]
        item: u64,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SelectCommands {
    /// Check keys such as `Discussion_12` or `Comment_40`
    Check {
        #[arg(value_name = "KEY", required = true)]
        keys: Vec<String>,

        /// Select comments inside this discussion
        #[arg(short = 'd', long = "discussion", value_name = "ID")]
        discussion: Option<u64>,
    },

    /// Uncheck keys
    Uncheck {
        #[arg(value_name = "KEY", required = true)]
        keys: Vec<String>,

        #[arg(short = 'd', long = "discussion", value_name = "ID")]
        discussion: Option<u64>,
    },

    /// Show the selection
    Show {
        #[arg(short = 'd', long = "discussion", value_name = "ID")]
        discussion: Option<u64>,
    },

    /// Clear the selection
    Clear {
        #[arg(short = 'd', long = "discussion", value_name = "ID", conflicts_with = "all")]
        discussion: Option<u64>,

        /// Clear every scope
        #[arg(long = "all")]
        all: bool,
    },
}

/// Where a bulk command reads ids from besides positional arguments
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// File containing ids ("-" for stdin)
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Format of the input file
    #[arg(long = "format", value_enum, default_value_t = IdFormat::Text)]
    pub format: IdFormat,

    /// CSV field delimiter
    #[arg(long = "delimiter", default_value_t = ',')]
    pub delimiter: char,
}

impl InputArgs {
    /// True when ids should come from the actor's selection
    #[must_use]
    pub const fn uses_selection(&self, ids: &[u64]) -> bool {
        ids.is_empty() && self.input.is_none()
    }
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    /// Discussion ids (uses your selection when none are given)
    #[arg(value_name = "ID")]
    pub ids: Vec<u64>,

    /// Destination container
    #[arg(short = 't', long = "to", value_name = "ID")]
    pub to: u64,

    /// Leave a redirect stub in the source container
    #[arg(short = 'r', long = "redirect")]
    pub redirect: bool,

    #[command(flatten)]
    pub input: InputArgs,

    /// Skip confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Discussion ids (uses your selection when none are given)
    #[arg(value_name = "ID")]
    pub ids: Vec<u64>,

    #[command(flatten)]
    pub input: InputArgs,

    /// Skip confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteCommentsArgs {
    /// Discussion the comments belong to
    #[arg(short = 'd', long = "discussion", value_name = "ID")]
    pub discussion: u64,

    /// Comment ids (uses your selection in the discussion when none are given)
    #[arg(value_name = "ID")]
    pub ids: Vec<u64>,

    #[command(flatten)]
    pub input: InputArgs,

    /// Skip confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

impl Cli {
    /// Parse command-line arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_with_ids() {
        let cli = Cli::parse_from(["modr", "move", "4", "5", "--to", "2", "-r", "-y"]);
        let Commands::Move(args) = cli.command else {
            panic!("Expected Move command");
        };
        assert_eq!(args.ids, vec![4, 5]);
        assert_eq!(args.to, 2);
        assert!(args.redirect);
        assert!(args.yes);
        assert!(!args.input.uses_selection(&args.ids));
    }

    #[test]
    fn test_parse_move_from_selection() {
        let cli = Cli::parse_from(["modr", "mv", "--to", "3"]);
        let Commands::Move(args) = cli.command else {
            panic!("Expected Move command");
        };
        assert!(args.input.uses_selection(&args.ids));
        assert!(!args.redirect);
    }

    #[test]
    fn test_parse_delete_with_input_file() {
        let cli = Cli::parse_from(["modr", "delete", "-i", "ids.csv", "--format", "csv"]);
        let Commands::Delete(args) = cli.command else {
            panic!("Expected Delete command");
        };
        assert_eq!(args.input.input, Some(PathBuf::from("ids.csv")));
        assert_eq!(args.input.format, IdFormat::Csv);
        assert!(!args.input.uses_selection(&args.ids));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["modr", "container", "list", "--db", "forum", "--actor", "7", "--json"]);
        assert_eq!(cli.db.as_deref(), Some("forum"));
        assert_eq!(cli.actor, Some(7));
        assert!(cli.json);
    }

    #[test]
    fn test_parse_delete_comments() {
        let cli = Cli::parse_from(["modr", "delete-comments", "-d", "9", "40", "41"]);
        let Commands::DeleteComments(args) = cli.command else {
            panic!("Expected DeleteComments command");
        };
        assert_eq!(args.discussion, 9);
        assert_eq!(args.ids, vec![40, 41]);
    }

    #[test]
    fn test_select_clear_conflicts() {
        let result = Cli::try_parse_from(["modr", "select", "clear", "-d", "3", "--all"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_select_check_requires_key() {
        assert!(Cli::try_parse_from(["modr", "select", "check"]).is_err());
        let cli = Cli::parse_from(["modr", "select", "check", "Comment_4", "-d", "2"]);
        assert!(matches!(
            cli.command,
            Commands::Select {
                command: SelectCommands::Check { discussion: Some(2), .. }
            }
        ));
    }
}
