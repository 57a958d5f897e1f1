//! Error types for txfile.
//!
//! All operations return `Result<T>` which aliases `Result<T, TxFileError>`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from transactional file operations.
#[derive(Debug, Error)]
pub enum TxFileError {
    /// Destination already exists and overwrite was not requested.
    #[error("Destination already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Source file or directory does not exist.
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    /// Undoing at least one enlisted operation failed during an abort.
    ///
    /// Fatal: the filesystem may be only partially unwound. Not retriable.
    #[error("Rollback failed: {0}")]
    RollbackFailed(String),

    /// File system operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Unexpected error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for txfile operations.
pub type Result<T> = std::result::Result<T, TxFileError>;
