//! Error types for Khulan Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    #[error("Unknown page status: {0}")]
    UnknownPageStatus(String),

    #[error("Invalid blueprint: {0}")]
    InvalidBlueprint(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_entity_kind_display() {
        let err = CoreError::UnknownEntityKind("block".to_string());
        assert_eq!(err.to_string(), "Unknown entity kind: block");
    }

    #[test]
    fn test_blueprint_error_conversion() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("fields: [").unwrap_err();
        let err: CoreError = yaml_err.into();
        assert!(err.to_string().starts_with("Invalid blueprint"));
    }
}
