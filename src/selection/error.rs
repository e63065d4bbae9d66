//! Selection-specific error types

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum SelectionError {
    /// A key that is not `<Kind>_<id>`
    #[error("Malformed selection key: {0:?}")]
    MalformedKey(String),

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}
