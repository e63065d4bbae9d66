//! Database-specific error types
//!
//! This module defines all error types that can occur during storage operations.
//!
//! # Error Types
//!
//! - **`SledError`**: Errors from the underlying sled embedded database
//! - **`DecodeError`** / **`EncodeError`**: bincode failures reading or writing records
//! - **`SerializeError`**: Malformed keys or values that bincode never saw
//! - **`NotFound`**: A referenced record does not exist
//! - **`ValidationError`**: A record was rejected by the item schema
//! - **`InvalidInput`**: Caller-supplied values that cannot be parsed
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.

use thiserror::Error;

/// Database-specific errors
#[derive(Debug, Error)]
pub enum DbError {
    /// Represents a sled database error
    #[error("Database error: {0}")]
    SledError(#[from] sled::Error),

    /// Represents a bincode decoding error
    #[error("Error while decoding data: {0}")]
    DecodeError(#[from] bincode::error::DecodeError),

    /// Represents a bincode encoding error
    #[error("Error while encoding data: {0}")]
    EncodeError(#[from] bincode::error::EncodeError),

    /// Generic serialization/deserialization error
    #[error("Error during serialization: {0}")]
    SerializeError(String),

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record rejected by the item schema
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Invalid input provided (e.g., an unparsable id)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DbError {
    /// True when the error came from schema validation rather than the storage engine
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
