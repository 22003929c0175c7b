//! Error handling for cassnap-store
//!
//! Wraps cassnap-core ExError with store-specific helpers

use cassnap_core::errors::{ExError, ExErrorKind};
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create an IO error naming the path involved
pub fn io_error(operation: &str, path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_subject(path.display().to_string())
        .with_message(err.to_string())
}

/// Create an error for a malformed or unreadable archive
pub fn archive_error(operation: &str, archive: &Path, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(operation.to_string())
        .with_subject(archive.display().to_string())
        .with_message(reason.into())
}

/// Create an error from a zip codec failure
pub fn from_zip(operation: &str, archive: &Path, err: zip::result::ZipError) -> ExError {
    match err {
        zip::result::ZipError::Io(e) => io_error(operation, archive, e),
        other => archive_error(operation, archive, other.to_string()),
    }
}

/// Create a node settings error
pub fn settings_error(path: &Path, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("node_settings")
        .with_subject(path.display().to_string())
        .with_message(reason.into())
}
