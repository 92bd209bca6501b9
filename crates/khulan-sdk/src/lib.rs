//! Khulan SDK
//!
//! Transparent write-through / read-through cache mirroring a flat-file
//! content model into a document store, plus bulk indexing and queries
//! against the mirrored documents.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use khulan_sdk::{Khulan, KhulanConfig};
//! use khulan_repository::SourceConfig;
//!
//! let khulan = Khulan::builder()
//!     .with_config(
//!         KhulanConfig::new()
//!             .with_source(SourceConfig::new("site").with_languages(["en", "de"]))
//!             .read_through(true),
//!     )
//!     .build()?;
//!
//! // Bulk index: two passes so relations resolve
//! let report = khulan.indexer().reindex_all(2).await?;
//! println!("{}", report);
//!
//! // Cached reads
//! if let Some(page) = khulan.page("blog/hello-world").await? {
//!     let content = page.content(Some("de")).await?;
//! }
//!
//! // Queries
//! let tagged = khulan
//!     .query()
//!     .find_json(&serde_json::json!({"tags[,]": "Punk"}))
//!     .await?;
//! ```

pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod indexer;
pub mod khulan;
pub mod query;
pub mod resolver;

pub use builder::KhulanBuilder;
pub use config::KhulanConfig;
pub use entity::CachedEntity;
pub use error::{Result, SdkError};
pub use gateway::CacheGateway;
pub use indexer::{index_specs, IndexReport, Indexer, DEFAULT_PASSES};
pub use khulan::Khulan;
pub use query::{
    ModelCollection, ModelResolver, Query, QueryFacade, QueryResult, SourceModelResolver,
};
pub use resolver::StoreReferenceResolver;

// Re-export the lower layers for convenience
pub use khulan_core::{CacheKey, Document, EntityKind, FieldMap, Languages, Value};
pub use khulan_repository::{ContentEntity, ContentSource, FileSystemContentSource, SourceConfig};
pub use khulan_store::{Filter, KeyValueCache, StoreClient, StoreConfig};
