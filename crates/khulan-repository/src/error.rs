//! Error types for the backing store layer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for backing store operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur while reading or writing entity content
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// File not found at the specified path
    #[error("Content not found: {path}")]
    NotFound { path: String },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Invalid path provided
    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    /// Deleting a page with children requires force
    #[error("Page '{id}' has children; delete with force")]
    HasChildren { id: String },

    /// Operation not supported for this entity kind
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Content file that is not a field map
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Generic error
    #[error("Repository error: {0}")]
    Other(String),
}
