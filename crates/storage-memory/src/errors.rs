//! Storage-specific error types.
//!
//! These errors are internal to the storage layer and are converted to
//! `portfolioviz_core::Error` before being returned to callers.

use portfolioviz_core::errors::{DatabaseError, Error};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Duplicate {kind} record for key {key}")]
    Duplicate {
        kind: &'static str,
        key: String,
    },

    #[error("No {kind} record for key {key}")]
    NotFound {
        kind: &'static str,
        key: String,
    },
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::LockPoisoned(e) => Error::Database(DatabaseError::Internal(e)),
            e @ StorageError::Duplicate { .. } => {
                Error::Database(DatabaseError::UniqueViolation(e.to_string()))
            }
            e @ StorageError::NotFound { .. } => {
                Error::Database(DatabaseError::NotFound(e.to_string()))
            }
        }
    }
}
