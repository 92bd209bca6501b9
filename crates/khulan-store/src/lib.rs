//! Document store layer for Khulan
//!
//! This crate provides the storage side of the content cache:
//!
//! - **DocumentStore**: abstract collection with find / upsert / delete /
//!   count / aggregate / secondary indexes
//! - **Memory backend**: in-process collections for tests and small sites
//! - **PostgreSQL backend**: JSONB tables (`postgres` feature)
//! - **StoreClient**: explicitly constructed, lazily connected store handle
//! - **KeyValueCache**: generic TTL cache kept in the cache collection
//!
//! # Quick Start
//!
//! ```no_run
//! use khulan_store::{KeyValueCache, StoreClient, StoreConfig};
//! use khulan_core::Value;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Arc::new(StoreClient::new(StoreConfig::memory(), false));
//!     let cache = KeyValueCache::new(client, true);
//!
//!     cache.set("greeting", "hello", 10).await;
//!     let value = cache.get("greeting", Value::Null).await;
//!     println!("{}", value);
//! }
//! ```

pub mod client;
pub mod error;
pub mod filter;
pub mod kv;
pub mod memory;
pub mod options;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use client::{CollectionNames, StoreBackend, StoreClient, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use filter::Filter;
pub use kv::{CacheEntry, KeyValueCache};
pub use memory::{MemoryCollection, MemoryDatabase};
pub use options::{FindOptions, IndexSpec, SortOrder, Stage};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresCollection, PostgresDatabase};
pub use traits::{DocumentDatabase, DocumentStore};
