//! Builder pattern for Khulan

use khulan_repository::{ContentSource, FileSystemContentSource};
use khulan_store::{DocumentDatabase, KeyValueCache, StoreClient};
use std::sync::Arc;
use tracing::info;

use crate::config::KhulanConfig;
use crate::error::{Result, SdkError};
use crate::gateway::CacheGateway;
use crate::khulan::Khulan;

/// Builder for [`Khulan`]
///
/// # Example
///
/// ```rust,ignore
/// use khulan_sdk::{KhulanBuilder, KhulanConfig};
/// use khulan_repository::SourceConfig;
///
/// // File-system site, configured store
/// let khulan = KhulanBuilder::new()
///     .with_config(KhulanConfig::new().with_source(SourceConfig::new("site")))
///     .build()?;
///
/// // Custom content source and an injected database (tests)
/// let khulan = KhulanBuilder::new()
///     .with_source(source)
///     .with_database(Arc::new(MemoryDatabase::new()))
///     .build()?;
/// ```
pub struct KhulanBuilder {
    config: KhulanConfig,
    source: Option<Arc<dyn ContentSource>>,
    database: Option<Arc<dyn DocumentDatabase>>,
}

impl KhulanBuilder {
    pub fn new() -> Self {
        Self {
            config: KhulanConfig::default(),
            source: None,
            database: None,
        }
    }

    pub fn with_config(mut self, config: KhulanConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a content source instead of the configured file-system one
    pub fn with_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use an already constructed database instead of connecting
    pub fn with_database(mut self, database: Arc<dyn DocumentDatabase>) -> Self {
        self.database = Some(database);
        self
    }

    pub fn build(self) -> Result<Khulan> {
        let config = self.config;

        let source: Arc<dyn ContentSource> = match self.source {
            Some(source) => source,
            None => {
                config
                    .source
                    .validate()
                    .map_err(|e| SdkError::ConfigError(e.to_string()))?;
                Arc::new(FileSystemContentSource::from_config(&config.source)?)
            }
        };

        let client = Arc::new(match self.database {
            Some(database) => StoreClient::with_database(config.store.clone(), config.debug, database),
            None => StoreClient::new(config.store.clone(), config.debug),
        });

        let gateway = CacheGateway::new(client.clone(), source.languages().clone())
            .with_read(config.read)
            .with_write(config.write);
        let cache = KeyValueCache::new(client.clone(), config.auto_clean_cache);

        info!(
            "Khulan ready (read: {}, write: {}, debug: {})",
            config.read, config.write, config.debug
        );

        Ok(Khulan {
            config,
            client,
            source,
            gateway: Arc::new(gateway),
            cache: Arc::new(cache),
        })
    }
}

impl Default for KhulanBuilder {
    fn default() -> Self {
        Self::new()
    }
}
