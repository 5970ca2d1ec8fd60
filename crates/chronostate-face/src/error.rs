//! Error types for the face module.

use thiserror::Error;

/// Errors that can occur on a face.
#[derive(Debug, Error)]
pub enum FaceError {
    /// Unregistering a prefix that is not (or no longer) registered.
    #[error("prefix not registered: {0}")]
    PrefixNotRegistered(u64),

    /// The face has been closed.
    #[error("face closed")]
    Closed,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for face operations.
pub type Result<T> = std::result::Result<T, FaceError>;
