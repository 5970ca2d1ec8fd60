//! Store errors.

use thiserror::Error;

/// Failure of a store operation.
///
/// Every variant is transient from a caller's point of view: the server
/// reports them as a failed scan, never as a bad request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Database(#[from] rusqlite::Error),

    /// A lookup that must succeed found nothing, e.g. a missing table row.
    #[error("no such {0}")]
    NotFound(String),

    /// A record is malformed, either as supplied or as read back.
    #[error("invalid record: {0}")]
    InvalidData(String),

    #[error("schema migration failed: {0}")]
    Migration(String),

    /// The blocking worker running a query panicked or was cancelled.
    #[error("store worker failed: {0}")]
    Task(String),

    #[error("store I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chronostate_core::CoreError> for StoreError {
    fn from(e: chronostate_core::CoreError) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
