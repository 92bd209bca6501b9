//! CLI configuration loading

use anyhow::Result;
use khulan_sdk::KhulanConfig;
use std::path::Path;

/// Default configuration file, without extension
pub const DEFAULT_CONFIG_FILE: &str = "config/khulan";

/// Load configuration from a `.env` file, a config file and `KHULAN_*`
/// environment variables, in increasing order of precedence
///
/// Nested keys use `__`, e.g. `KHULAN_STORE__HOST=db.internal`. Lists are
/// comma separated: `KHULAN_SOURCE__LANGUAGES=en,de`.
///
/// An explicitly given file must exist and parse; only the default file
/// falls back to the default configuration.
pub fn load(file: Option<&Path>) -> Result<KhulanConfig> {
    dotenvy::dotenv().ok();

    let explicit = file.is_some();
    let file = match file {
        Some(path) => ::config::File::from(path).required(true),
        None => ::config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let config_result = ::config::Config::builder()
        .add_source(file)
        .add_source(
            ::config::Environment::with_prefix("KHULAN")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("source.languages"),
        )
        .build();

    match config_result {
        Ok(cfg) => cfg
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize config: {}", e)),
        Err(e) if explicit => Err(anyhow::anyhow!("Failed to load config file: {}", e)),
        Err(e) => {
            tracing::info!("No usable config file ({}), using default configuration", e);
            Ok(KhulanConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("khulan.yaml");
        fs::write(
            &path,
            "read: true\nstore:\n  database: cms\nsource:\n  root: site\n  languages: [en, de]\n",
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();

        assert!(config.read);
        assert!(config.write);
        assert_eq!(config.store.database, "cms");
        assert_eq!(config.store.port, 5432);
        assert_eq!(config.source.root, "site");
        assert!(config.languages().is_multilingual());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.yaml");

        let err = load(Some(&path)).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load config file"));
    }

    #[test]
    fn test_malformed_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("khulan.yaml");
        fs::write(&path, "store: [unclosed\n").unwrap();

        assert!(load(Some(&path)).is_err());
    }
}
