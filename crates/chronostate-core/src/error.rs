//! Error types for chronostate core.

use thiserror::Error;

/// Errors raised while parsing names or encoding payloads.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid name component: {0}")]
    InvalidComponent(String),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
