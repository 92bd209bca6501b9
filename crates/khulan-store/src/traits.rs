//! Core trait definitions for the document store
//!
//! - [`DocumentStore`]: one collection of documents keyed by `_id`
//! - [`DocumentDatabase`]: a named set of collections
//!
//! # Examples
//!
//! ```no_run
//! use khulan_store::{DocumentDatabase, DocumentStore, Filter, MemoryDatabase};
//! use khulan_core::{Document, Value};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let database = MemoryDatabase::new();
//! let content = database.collection("khulan");
//!
//! let mut doc = Document::new();
//! doc.insert("id".to_string(), Value::from("home"));
//! content.upsert("0123456789abcdef01234567", doc).await?;
//!
//! let found = content.find_one(&Filter::eq("id", "home"), None).await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use khulan_core::Document;
use std::sync::Arc;

use crate::filter::Filter;
use crate::options::{FindOptions, IndexSpec, Stage};
use crate::StoreResult;

/// A collection of documents keyed by `_id`
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    /// Insert or fully replace the document stored under `id`
    ///
    /// The stored document carries `_id = id`; any `_id` in `doc` is ignored.
    async fn upsert(&self, id: &str, doc: Document) -> StoreResult<()>;

    /// First document matching `filter`, optionally projected
    async fn find_one(
        &self,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> StoreResult<Option<Document>> {
        let mut options = FindOptions::new().with_limit(1);
        options.projection = projection.map(<[String]>::to_vec);
        Ok(self.find(filter, &options).await?.into_iter().next())
    }

    /// Every document matching `filter`
    async fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<Document>>;

    /// Delete the first matching document; returns the number deleted
    async fn delete_one(&self, filter: &Filter) -> StoreResult<u64>;

    /// Delete every matching document; returns the number deleted
    async fn delete_many(&self, filter: &Filter) -> StoreResult<u64>;

    async fn count(&self, filter: &Filter) -> StoreResult<u64>;

    /// Create a secondary index; creating an existing index is a no-op
    async fn create_index(&self, spec: IndexSpec) -> StoreResult<()>;

    async fn aggregate(&self, pipeline: &[Stage]) -> StoreResult<Vec<Document>>;

    /// Drop every document and index of the collection
    async fn drop_collection(&self) -> StoreResult<()>;
}

/// A database holding named collections
#[async_trait]
pub trait DocumentDatabase: Send + Sync {
    /// Handle to a collection, created on first use
    fn collection(&self, name: &str) -> Arc<dyn DocumentStore>;

    /// Check connectivity
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
