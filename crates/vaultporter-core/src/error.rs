//! Error types for vault transfers.
//!
//! All errors in the system are represented by the [`Error`] enum.
//! This ensures composable error handling across crates.

use std::io;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// The core error type for all VaultPorter operations.
#[derive(ThisError, Debug)]
pub enum Error {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Invalid file path (empty, not a directory, etc.)
    #[error("Invalid file path: {reason}")]
    InvalidPath { reason: String },

    /// Path escapes the vault root
    #[error("Path traversal detected: {path}")]
    PathTraversalAttempt { path: PathBuf },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    /// Validation error
    #[error("Validation error: {reason}")]
    ValidationError { reason: String },

    /// Target exists and the conflict strategy is `skip`
    #[error("Operation cancelled due to conflict: {path} already exists")]
    ConflictSkipped { path: String },

    /// Source and target content differ after writing
    #[error("Checksum mismatch for {path}: source {expected}, target {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// A transfer for the same source file is already in flight
    #[error("An operation is already active for this file: {path}")]
    OperationActive { path: PathBuf },

    /// Operation was cancelled by the caller
    #[error("Operation cancelled: {reason}")]
    Cancelled { reason: String },

    /// Lookup by key failed
    #[error("Not found: {key}")]
    NotFound { key: String },

    /// Generic unclassified error
    #[error("Error: {0}")]
    Other(String),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error
    pub fn io(err: io::Error) -> Self {
        Error::Io(err)
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Create an invalid path error
    pub fn invalid_path(reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            reason: reason.into(),
        }
    }

    /// Create a path traversal error
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Error::PathTraversalAttempt { path: path.into() }
    }

    /// Create a configuration error
    pub fn config_error(reason: impl Into<String>) -> Self {
        Error::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation_error(reason: impl Into<String>) -> Self {
        Error::ValidationError {
            reason: reason.into(),
        }
    }

    /// Create a conflict-skipped error
    pub fn conflict_skipped(path: impl Into<String>) -> Self {
        Error::ConflictSkipped { path: path.into() }
    }

    /// Create a checksum mismatch error
    pub fn checksum_mismatch(
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Error::ChecksumMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an operation-already-active error
    pub fn operation_active(path: impl Into<PathBuf>) -> Self {
        Error::OperationActive { path: path.into() }
    }

    /// Create a cancellation error
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Error::Cancelled {
            reason: reason.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound { key: key.into() }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// True for failures that ended the transfer before any I/O happened
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::ConflictSkipped { .. } | Error::Cancelled { .. })
    }

    /// True when the underlying I/O error is `NotFound`
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() == io::ErrorKind::NotFound,
            Error::FileNotFound { .. } => true,
            _ => false,
        }
    }
}
