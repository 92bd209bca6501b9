//! Error types for the document store layer

use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed filter document
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Collection name unusable by the backend
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    /// A unique index rejected the write
    #[error("Duplicate key for index '{index}'")]
    DuplicateKey { index: String },

    /// Backend not compiled into this build
    #[error("Unsupported store backend: {0}")]
    UnsupportedBackend(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error (when database feature is enabled)
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
