//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing a document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error (permission denied, disk full, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Dotted path is malformed
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A path segment runs through a value that is not an object
    #[error("Path conflict at '{0}': parent is not an object")]
    PathConflict(String),

    /// Insert refused because the path already holds a value
    #[error("Value already exists at '{0}'")]
    AlreadyExists(String),

    /// Failed to set file permissions
    #[error("Failed to set file permissions: {0}")]
    Permissions(String),

    /// Lock was poisoned (another thread panicked while holding the lock)
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Create an invalid path error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath(message.into())
    }

    /// Create an already-exists error for the given dotted path.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_path_formats_message() {
        let err = StoreError::invalid_path("empty segment in 'a..b'");
        assert_eq!(err.to_string(), "Invalid path: empty segment in 'a..b'");
    }

    #[test]
    fn already_exists_formats_path() {
        let err = StoreError::already_exists("credentials.work");
        assert_eq!(err.to_string(), "Value already exists at 'credentials.work'");
    }

    #[test]
    fn io_wraps_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StoreError::from(io_err);
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn json_wraps_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::from(json_err);
        assert!(err.to_string().contains("JSON error"));
    }
}
