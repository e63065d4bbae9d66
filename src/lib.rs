//! Modr - bulk moderation for hierarchical forums
//!
//! This library keeps per-container aggregate counters consistent while
//! moderators move and delete content in bulk. It provides:
//! - an embedded store of containers, items and comments (`db`)
//! - the aggregate ledger that owns every counter (`ledger`)
//! - per-actor selection sets that drive bulk actions (`selection`)
//! - the move and delete executors (`moderation`)

use thiserror::Error;

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod content;
pub mod db;
pub mod ledger;
pub mod moderation;
pub mod output;
pub mod selection;

#[cfg(test)]
pub mod testing;

/// Error enum, contains all failure states of the program
#[derive(Debug, Error)]
pub enum ModrError {
    /// Database error
    #[error("Database error: {0}")]
    DbError(#[from] db::DbError),
    /// Counter hierarchy error
    #[error("Ledger error: {0}")]
    LedgerError(#[from] ledger::LedgerError),
    /// Selection set error
    #[error("Selection error: {0}")]
    SelectionError(#[from] selection::SelectionError),
    /// A bulk action failed or was refused
    #[error(transparent)]
    ModerationError(#[from] moderation::ModerationError),
    /// Content creation error
    #[error(transparent)]
    ContentError(#[from] content::ContentError),
    /// Represents a configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// Represents an I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
