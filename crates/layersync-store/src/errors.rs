//! Error handling for layersync-store
//!
//! Wraps layersync-core SyncError with store-specific helpers

#![allow(clippy::result_large_err)]

use layersync_core::{SyncError, SyncErrorKind};

/// Result type alias using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> SyncError {
    SyncError::new(SyncErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create a commit-rejection error carrying the storage layer's message
pub fn commit_rejected(err: rusqlite::Error) -> SyncError {
    SyncError::new(SyncErrorKind::Commit)
        .with_op("commit")
        .with_message("storage rejected the commit")
        .with_details(vec![err.to_string()])
}

/// Create a geometry encoding error
pub fn wkt_error(operation: &str, detail: String) -> SyncError {
    SyncError::new(SyncErrorKind::InvalidGeometry)
        .with_op(operation.to_string())
        .with_message(detail)
}
