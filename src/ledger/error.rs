//! Ledger-specific error types

use thiserror::Error;

use crate::db::{ContainerId, DbError};

/// Errors raised while maintaining aggregate counters
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The container is not part of the loaded hierarchy
    #[error("Unknown container: {0}")]
    UnknownContainer(ContainerId),

    /// A container names a parent that does not exist
    #[error("Container {container} references missing parent {parent}")]
    OrphanContainer {
        container: ContainerId,
        parent: ContainerId,
    },

    /// Following parent links from this container never reaches a root
    #[error("Container {0} is part of a parent cycle")]
    Cycle(ContainerId),

    /// Storage error while reading or writing counters
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}
