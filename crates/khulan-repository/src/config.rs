//! Content source configuration

use khulan_core::Languages;
use serde::{Deserialize, Serialize};

/// Where the site's content lives and which languages it has
///
/// # Examples
///
/// ```rust
/// use khulan_repository::SourceConfig;
///
/// // Single-language site
/// let config = SourceConfig::new("site");
///
/// // Multilingual site, English by default
/// let config = SourceConfig::new("site").with_languages(["en", "de"]);
/// assert!(config.languages().is_multilingual());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root holding `content/`, `accounts/` and `blueprints/`
    #[serde(default)]
    pub root: String,

    /// Language codes; empty for a single-language site
    #[serde(default)]
    pub languages: Vec<String>,

    /// Current language; defaults to the first code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
}

impl SourceConfig {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            languages: Vec::new(),
            default_language: None,
        }
    }

    pub fn with_languages<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_language(mut self, code: impl Into<String>) -> Self {
        self.default_language = Some(code.into());
        self
    }

    /// Language setup described by this configuration
    pub fn languages(&self) -> Languages {
        let languages = Languages::new(self.languages.clone());
        match &self.default_language {
            Some(code) if languages.is_multilingual() => languages.with_current(code.clone()),
            _ => languages,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.is_empty() {
            return Err(ConfigError::MissingField {
                field: "root".to_string(),
            });
        }
        if let Some(code) = &self.default_language {
            if !self.languages.contains(code) {
                return Err(ConfigError::UnknownLanguage { code: code.clone() });
            }
        }
        Ok(())
    }
}

/// Configuration error
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// A required field is missing
    MissingField { field: String },
    /// The default language is not one of the configured languages
    UnknownLanguage { code: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingField { field } => {
                write!(f, "content source requires {} to be set", field)
            }
            ConfigError::UnknownLanguage { code } => {
                write!(f, "default language '{}' is not a configured language", code)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
