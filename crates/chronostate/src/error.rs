//! Error types for the state server.

use chronostate_core::{CoreError, Fingerprint, Version};
use chronostate_face::FaceError;
use chronostate_store::StoreError;
use thiserror::Error;

/// Failure categories reported to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unparsable name or parameters. Never answered.
    MalformedRequest,
    /// Restore target version absent.
    NotFound,
    /// Fingerprint mismatch on restore.
    IntegrityMismatch,
    /// Filesystem write failed during restore.
    ApplyFailed,
    /// An underlying store read failed.
    TransientScanFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedRequest => "malformed_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::IntegrityMismatch => "integrity_mismatch",
            ErrorKind::ApplyFailed => "apply_failed",
            ErrorKind::TransientScanFailure => "transient_scan_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while serving requests.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("{filename} has no version {version}")]
    NotFound { filename: String, version: Version },

    #[error("fingerprint mismatch for {filename}: expected {expected}, found {actual}")]
    IntegrityMismatch {
        filename: String,
        expected: Fingerprint,
        actual: Fingerprint,
    },

    #[error("failed to apply {filename}: {source}")]
    ApplyFailed {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// Store read failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Face error.
    #[error("face error: {0}")]
    Face(#[from] FaceError),

    /// Payload encoding error.
    #[error("codec error: {0}")]
    Codec(#[from] CoreError),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    Config(String),

    /// No data arrived before the consumer's timeout.
    #[error("no response for {0}")]
    NoResponse(String),

    /// A producer answered with a packet the consumer cannot use.
    #[error("bad response for {name}: {reason}")]
    BadResponse { name: String, reason: String },
}

impl ServerError {
    /// The consumer-facing category, for errors that have one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ServerError::MalformedRequest(_) => Some(ErrorKind::MalformedRequest),
            ServerError::NotFound { .. } => Some(ErrorKind::NotFound),
            ServerError::IntegrityMismatch { .. } => Some(ErrorKind::IntegrityMismatch),
            ServerError::ApplyFailed { .. } => Some(ErrorKind::ApplyFailed),
            ServerError::Store(_) => Some(ErrorKind::TransientScanFailure),
            ServerError::Face(_)
            | ServerError::Codec(_)
            | ServerError::Config(_)
            | ServerError::NoResponse(_)
            | ServerError::BadResponse { .. } => None,
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_transient() {
        let err = ServerError::from(StoreError::NotFound("actions".into()));
        assert_eq!(err.kind(), Some(ErrorKind::TransientScanFailure));
        assert_eq!(ServerError::NoResponse("/x".into()).kind(), None);
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(ErrorKind::IntegrityMismatch.to_string(), "integrity_mismatch");
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
    }
}
