//! Error types for modelshelf.
//!
//! Every fallible operation in the core returns [`OrganizerError`]. Outcomes
//! that the reconciliation treats as normal control flow (registry "not
//! found", duplicate content, target collisions) are *not* errors; they are
//! reported through the per-file outcome enums instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the modelshelf core.
#[derive(Debug, Error)]
pub enum OrganizerError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Registry returned transient status {status} for {url}")]
    TransientStatus { status: u16, url: String },

    #[error("Registry error: {message}")]
    Registry {
        message: String,
        status_code: Option<u16>,
    },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Catalog uniqueness conflict in {table}: {message}")]
    CatalogConflict { table: String, message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for modelshelf operations.
pub type Result<T> = std::result::Result<T, OrganizerError>;

impl From<std::io::Error> for OrganizerError {
    fn from(err: std::io::Error) -> Self {
        OrganizerError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for OrganizerError {
    fn from(err: serde_json::Error) -> Self {
        OrganizerError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for OrganizerError {
    fn from(err: rusqlite::Error) -> Self {
        OrganizerError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for OrganizerError {
    fn from(err: reqwest::Error) -> Self {
        OrganizerError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl OrganizerError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        OrganizerError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Check if this error should trigger a registry retry.
    ///
    /// Only server-side transient statuses qualify; transport failures are
    /// fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrganizerError::TransientStatus { .. })
    }

    /// Check if this is a catalog uniqueness conflict.
    pub fn is_catalog_conflict(&self) -> bool {
        matches!(self, OrganizerError::CatalogConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrganizerError::CatalogConflict {
            table: "model_files".into(),
            message: "UNIQUE constraint failed: model_files.path".into(),
        };
        assert_eq!(
            err.to_string(),
            "Catalog uniqueness conflict in model_files: UNIQUE constraint failed: model_files.path"
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(OrganizerError::TransientStatus {
            status: 500,
            url: "https://example.invalid".into()
        }
        .is_retryable());
        assert!(!OrganizerError::Registry {
            message: "bad request".into(),
            status_code: Some(400)
        }
        .is_retryable());
        assert!(!OrganizerError::Other("x".into()).is_retryable());
    }

    #[test]
    fn test_io_with_path_keeps_path() {
        let err = OrganizerError::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/models/a.safetensors",
        );
        match err {
            OrganizerError::Io { path, .. } => {
                assert_eq!(path, Some(PathBuf::from("/models/a.safetensors")))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
