use std::io;
use std::path::PathBuf;

use kit_sync::SyncError;

/// Errors from file helpers.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The file could not be opened.
    #[error("failed to open file {path}: {source}")]
    FailedToOpenFile { path: PathBuf, source: io::Error },

    /// Parent directories could not be created.
    #[error("failed to create directory hierarchy {path}: {source}")]
    CreateDirHierarchy { path: PathBuf, source: io::Error },

    /// The file could not be created.
    #[error("failed to create file {path}: {source}")]
    CreateFile { path: PathBuf, source: io::Error },

    /// Nothing could be read to sniff a content type from.
    #[error("failed to obtain content-type: {0}")]
    ObtainContentType(String),

    /// The caller's token was cancelled or expired.
    #[error(transparent)]
    Cancelled(#[from] SyncError),

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for file helpers.
pub type FsResult<T> = Result<T, FsError>;
