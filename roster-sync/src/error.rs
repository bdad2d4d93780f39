//! Error types for roster-sync.

use std::path::PathBuf;

use thiserror::Error;

use roster_api::ApiError;

/// Fatal errors of a reconciliation run or of report persistence.
///
/// Per-action remote failures are not errors at this level; they are
/// collected as [`crate::ActionError`] records in the run result.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The class catalog could not be fetched; nothing can be reconciled.
    #[error("cannot list classes: {0}")]
    Catalog(#[source] ApiError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run report JSON error.
    #[error("report JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
