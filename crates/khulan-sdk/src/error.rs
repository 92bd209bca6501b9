//! SDK error types

use khulan_repository::RepositoryError;
use khulan_store::StoreError;
use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Document store error
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Backing store error
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),

    /// Query that cannot be translated into a filter
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let error = SdkError::ConfigError("missing content root".to_string());
        assert!(error.to_string().contains("Configuration error"));
        assert!(error.to_string().contains("missing content root"));
    }

    #[test]
    fn test_store_error_conversion() {
        let error: SdkError = StoreError::DuplicateKey {
            index: "id_language".to_string(),
        }
        .into();
        assert!(error.to_string().starts_with("Store error"));
    }

    #[test]
    fn test_repository_error_conversion() {
        let error: SdkError = RepositoryError::HasChildren {
            id: "blog".to_string(),
        }
        .into();
        assert!(error.to_string().contains("has children"));
    }
}
