//! Configuration types for Khulan

use khulan_core::Languages;
use khulan_repository::SourceConfig;
use khulan_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// Main Khulan configuration
///
/// Read-through is off and write-through on by default, so the cache fills
/// up as content is saved without serving stale documents to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KhulanConfig {
    /// Document store connection
    pub store: StoreConfig,

    /// Backing content source
    pub source: SourceConfig,

    /// Serve entity content from the cache
    pub read: bool,

    /// Mirror entity content into the cache
    pub write: bool,

    /// Clean expired key-value entries on the first read of the process
    pub auto_clean_cache: bool,

    /// Bypass every cache read and flush the key-value cache on connect
    pub debug: bool,
}

impl Default for KhulanConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            source: SourceConfig::default(),
            read: false,
            write: true,
            auto_clean_cache: false,
            debug: false,
        }
    }
}

impl KhulanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    /// Enable or disable read-through
    pub fn read_through(mut self, enable: bool) -> Self {
        self.read = enable;
        self
    }

    /// Enable or disable write-through
    pub fn write_through(mut self, enable: bool) -> Self {
        self.write = enable;
        self
    }

    pub fn auto_clean_cache(mut self, enable: bool) -> Self {
        self.auto_clean_cache = enable;
        self
    }

    pub fn debug(mut self, enable: bool) -> Self {
        self.debug = enable;
        self
    }

    pub fn languages(&self) -> Languages {
        self.source.languages()
    }
}
