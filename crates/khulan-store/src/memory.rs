//! In-memory document store
//!
//! Keeps every collection in process memory. Suitable for testing, development
//! and single-process sites; data is lost when the process restarts.

use async_trait::async_trait;
use khulan_core::entity::fields;
use khulan_core::{Document, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

use crate::filter::{lookup, Filter};
use crate::options::{apply_stages, FindOptions, IndexSpec, Stage};
use crate::traits::{DocumentDatabase, DocumentStore};
use crate::{StoreError, StoreResult};

/// In-memory database
#[derive(Default)]
pub struct MemoryDatabase {
    collections: Mutex<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete handle to a collection, created on first use
    pub fn memory_collection(&self, name: &str) -> Arc<MemoryCollection> {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name)))
            .clone()
    }
}

impl DocumentDatabase for MemoryDatabase {
    fn collection(&self, name: &str) -> Arc<dyn DocumentStore> {
        self.memory_collection(name)
    }
}

/// In-memory collection
pub struct MemoryCollection {
    name: String,
    /// Map of `_id` -> document
    documents: RwLock<BTreeMap<String, Document>>,
    indexes: RwLock<Vec<IndexSpec>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(BTreeMap::new()),
            indexes: RwLock::new(Vec::new()),
        }
    }

    /// Indexes created so far
    pub async fn indexes(&self) -> Vec<IndexSpec> {
        self.indexes.read().await.clone()
    }

    /// Values of the index keys; `None` when the document is not indexed
    fn index_key(doc: &Document, spec: &IndexSpec) -> Option<Vec<Value>> {
        spec.field_names()
            .map(|field| match lookup(doc, field) {
                None | Some(Value::Null) => None,
                Some(value) => Some(value.clone()),
            })
            .collect()
    }

    fn check_unique(
        documents: &BTreeMap<String, Document>,
        indexes: &[IndexSpec],
        id: &str,
        doc: &Document,
    ) -> StoreResult<()> {
        for spec in indexes.iter().filter(|spec| spec.unique) {
            let Some(key) = Self::index_key(doc, spec) else {
                continue;
            };
            let collides = documents
                .iter()
                .filter(|(other_id, _)| other_id.as_str() != id)
                .any(|(_, other)| Self::index_key(other, spec).as_ref() == Some(&key));
            if collides {
                return Err(StoreError::DuplicateKey {
                    index: spec.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn matching_ids(documents: &BTreeMap<String, Document>, filter: &Filter) -> Vec<String> {
        documents
            .iter()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, id: &str, mut doc: Document) -> StoreResult<()> {
        doc.insert(fields::PRIMARY_KEY.to_string(), Value::from(id));

        let indexes = self.indexes.read().await;
        let mut documents = self.documents.write().await;
        Self::check_unique(&documents, &indexes, id, &doc)?;
        documents.insert(id.to_string(), doc);
        Ok(())
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<Document>> {
        let documents = self.documents.read().await;
        let matched = documents
            .values()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect();
        Ok(options.apply(matched))
    }

    async fn delete_one(&self, filter: &Filter) -> StoreResult<u64> {
        let mut documents = self.documents.write().await;
        let first = documents
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| id.clone());
        Ok(match first {
            Some(id) => documents.remove(&id).map_or(0, |_| 1),
            None => 0,
        })
    }

    async fn delete_many(&self, filter: &Filter) -> StoreResult<u64> {
        let mut documents = self.documents.write().await;
        let ids = Self::matching_ids(&documents, filter);
        for id in &ids {
            documents.remove(id);
        }
        Ok(ids.len() as u64)
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let documents = self.documents.read().await;
        Ok(documents.values().filter(|doc| filter.matches(doc)).count() as u64)
    }

    async fn create_index(&self, spec: IndexSpec) -> StoreResult<()> {
        let mut indexes = self.indexes.write().await;
        if indexes.iter().any(|existing| existing.name == spec.name) {
            return Ok(());
        }

        if spec.unique {
            let documents = self.documents.read().await;
            let mut seen: Vec<Vec<Value>> = Vec::new();
            for doc in documents.values() {
                if let Some(key) = Self::index_key(doc, &spec) {
                    if seen.contains(&key) {
                        return Err(StoreError::DuplicateKey { index: spec.name });
                    }
                    seen.push(key);
                }
            }
        }

        indexes.push(spec);
        Ok(())
    }

    async fn aggregate(&self, pipeline: &[Stage]) -> StoreResult<Vec<Document>> {
        let documents = self.documents.read().await;
        Ok(apply_stages(documents.values().cloned().collect(), pipeline))
    }

    async fn drop_collection(&self) -> StoreResult<()> {
        let mut indexes = self.indexes.write().await;
        let mut documents = self.documents.write().await;
        indexes.clear();
        documents.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SortOrder;

    fn page(id: &str, language: &str) -> Document {
        Document::from([
            ("id".to_string(), Value::from(id)),
            ("language".to_string(), Value::from(language)),
            ("modelType".to_string(), Value::from("page")),
        ])
    }

    fn id_language_index() -> IndexSpec {
        IndexSpec::new("id_language")
            .key("id", SortOrder::Ascending)
            .key("language", SortOrder::Ascending)
            .unique()
    }

    #[tokio::test]
    async fn test_upsert_replaces_document() {
        let collection = MemoryCollection::new("khulan");

        collection.upsert("k1", page("home", "en")).await.unwrap();
        let mut updated = page("home", "en");
        updated.insert("title".to_string(), Value::from("Home"));
        collection.upsert("k1", updated).await.unwrap();

        assert_eq!(collection.count(&Filter::All).await.unwrap(), 1);
        let doc = collection
            .find_one(&Filter::eq("_id", "k1"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["title"], Value::from("Home"));
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicates() {
        let collection = MemoryCollection::new("khulan");
        collection.create_index(id_language_index()).await.unwrap();

        collection.upsert("k1", page("home", "en")).await.unwrap();
        collection.upsert("k2", page("home", "de")).await.unwrap();

        let err = collection.upsert("k3", page("home", "en")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { ref index } if index == "id_language"));

        // Re-writing the same key is not a collision
        collection.upsert("k1", page("home", "en")).await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_index_is_sparse() {
        let collection = MemoryCollection::new("khulan");
        let uuid_index = IndexSpec::new("uuid_language")
            .key("uuid", SortOrder::Ascending)
            .key("language", SortOrder::Ascending)
            .unique();
        collection.create_index(uuid_index).await.unwrap();

        collection.upsert("k1", page("a", "en")).await.unwrap();
        collection.upsert("k2", page("b", "en")).await.unwrap();
        assert_eq!(collection.count(&Filter::All).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_create_index_fails_on_existing_duplicates() {
        let collection = MemoryCollection::new("khulan");
        collection.upsert("k1", page("home", "en")).await.unwrap();
        collection.upsert("k2", page("home", "en")).await.unwrap();

        assert!(collection.create_index(id_language_index()).await.is_err());
        assert!(collection.indexes().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_one_and_many() {
        let collection = MemoryCollection::new("khulan");
        collection.upsert("k1", page("home", "en")).await.unwrap();
        collection.upsert("k2", page("home", "de")).await.unwrap();
        collection.upsert("k3", page("about", "en")).await.unwrap();

        assert_eq!(collection.delete_one(&Filter::eq("id", "home")).await.unwrap(), 1);
        assert_eq!(collection.delete_many(&Filter::eq("id", "home")).await.unwrap(), 1);
        assert_eq!(collection.delete_many(&Filter::eq("id", "home")).await.unwrap(), 0);
        assert_eq!(collection.count(&Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_drop_collection() {
        let database = MemoryDatabase::new();
        let collection = database.collection("khulan");
        collection.create_index(id_language_index()).await.unwrap();
        collection.upsert("k1", page("home", "en")).await.unwrap();

        collection.drop_collection().await.unwrap();

        let same = database.memory_collection("khulan");
        assert_eq!(same.count(&Filter::All).await.unwrap(), 0);
        assert!(same.indexes().await.is_empty());
    }
}
