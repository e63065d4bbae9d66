//! Moderation-specific error types

use serde::Serialize;
use thiserror::Error;

use super::core::BatchReport;
use crate::auth::Capability;
use crate::db::{ActorId, ContainerId, DbError};
use crate::ledger::LedgerError;
use crate::selection::SelectionError;

#[derive(Debug, Error)]
pub enum ModerationError {
    /// The actor may not perform the batch at all; nothing was changed
    #[error("Actor {actor} lacks {capability} capability on container {container}")]
    Forbidden {
        actor: ActorId,
        container: ContainerId,
        capability: Capability,
    },

    /// Item creation was rejected mid-batch; `report` holds what was applied
    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        report: Box<BatchReport>,
    },

    /// Storage failed mid-batch; `report` holds what was applied
    #[error("Batch interrupted after {} item(s): {source}", .report.processed)]
    Interrupted {
        #[source]
        source: LedgerError,
        report: Box<BatchReport>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

/// Machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Forbidden,
    ValidationFailed,
    NotFound,
    Internal,
}

impl ModerationError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Interrupted { .. } | Self::Selection(_) | Self::Ledger(_) | Self::Db(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Partial results carried by the error, if any
    #[must_use]
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            Self::ValidationFailed { report, .. } | Self::Interrupted { report, .. } => {
                Some(report.as_ref())
            }
            _ => None,
        }
    }
}

/// Serializable error body: `{"kind": ..., "message": ..., "report": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<BatchReport>,
}

impl From<&ModerationError> for ErrorResponse {
    fn from(err: &ModerationError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            report: err.report().cloned(),
        }
    }
}
