//! Read-through / write-through orchestration
//!
//! The backing store stays the source of truth. The gateway mirrors entity
//! content into the content collection on writes, serves it back on reads
//! when read-through is enabled, and removes every variant of an entity when
//! it is deleted.
//!
//! Store failures never fail a read: they are logged and the backing store
//! answers instead. Write helpers fold store failures into `false`.

use khulan_core::entity::fields;
use khulan_core::{derive_key, CacheKey, ContentCodec, FieldMap, Languages, Metadata, Value};
use khulan_repository::ContentEntity;
use khulan_store::{DocumentStore, Filter, StoreClient, StoreResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::error::Result;
use crate::resolver::StoreReferenceResolver;

/// Cache protocol between entities, the codec and the content collection
pub struct CacheGateway {
    client: Arc<StoreClient>,
    languages: Languages,
    codec: ContentCodec,
    read: bool,
    write: bool,
    /// Entities invalidated since their last explicit write
    pending_deletion: Mutex<HashSet<String>>,
}

impl CacheGateway {
    /// Gateway with write-through enabled and read-through disabled
    pub fn new(client: Arc<StoreClient>, languages: Languages) -> Self {
        Self {
            client,
            languages,
            codec: ContentCodec::new(),
            read: false,
            write: true,
            pending_deletion: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_read(mut self, enable: bool) -> Self {
        self.read = enable;
        self
    }

    pub fn with_write(mut self, enable: bool) -> Self {
        self.write = enable;
        self
    }

    pub fn languages(&self) -> &Languages {
        &self.languages
    }

    pub fn client(&self) -> &Arc<StoreClient> {
        &self.client
    }

    pub fn is_read_enabled(&self) -> bool {
        self.read
    }

    pub fn is_write_enabled(&self) -> bool {
        self.write
    }

    /// Key of an entity variant
    pub fn key(&self, entity: &dyn ContentEntity, language: Option<&str>) -> CacheKey {
        derive_key(entity.id(), language, &self.languages)
    }

    pub async fn content_collection(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        self.client.content_collection().await
    }

    pub fn is_pending_deletion(&self, id: &str) -> bool {
        self.pending().contains(id)
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.pending_deletion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached content of an entity variant
    ///
    /// `None` when read-through is disabled, in debug mode, on a miss or when
    /// the store is unavailable.
    pub async fn read_cache(
        &self,
        entity: &dyn ContentEntity,
        language: Option<&str>,
    ) -> Option<FieldMap> {
        if !self.read || self.client.is_debug() {
            return None;
        }

        let key = self.key(entity, language);
        let found = match self.content_collection().await {
            Ok(content) => {
                content
                    .find_one(&Filter::eq(fields::PRIMARY_KEY, key.as_str()), None)
                    .await
            }
            Err(e) => Err(e),
        };

        match found {
            Ok(Some(doc)) => {
                debug!("Cache hit for {} '{}'", entity.kind(), entity.id());
                Some(self.codec.decode(&doc))
            }
            Ok(None) => {
                debug!("Cache miss for {} '{}'", entity.kind(), entity.id());
                None
            }
            Err(e) => {
                warn!("Cache read failed for '{}': {}", entity.id(), e);
                None
            }
        }
    }

    /// Content of an entity variant, from the cache when possible
    ///
    /// On a miss the backing store answers and, unless the entity is pending
    /// deletion, its content is written through.
    pub async fn read_content(
        &self,
        entity: &dyn ContentEntity,
        language: Option<&str>,
    ) -> Result<FieldMap> {
        if let Some(cached) = self.read_cache(entity, language).await {
            return Ok(cached);
        }

        let data = entity.read_content(language).await?;
        if !data.is_empty() && !self.is_pending_deletion(entity.id()) {
            self.write_cache(entity, &data, language).await;
        }
        Ok(data)
    }

    /// Write content to the backing store, then through to the cache
    pub async fn write_content(
        &self,
        entity: &dyn ContentEntity,
        fields: &FieldMap,
        language: Option<&str>,
    ) -> bool {
        if let Err(e) = entity.write_content(fields, language).await {
            warn!("Failed to write '{}': {}", entity.id(), e);
            return false;
        }
        self.pending().remove(entity.id());
        self.write_cache(entity, fields, language).await
    }

    /// Write through to the cache; a no-op success when write-through is off
    pub async fn write_cache(
        &self,
        entity: &dyn ContentEntity,
        fields: &FieldMap,
        language: Option<&str>,
    ) -> bool {
        if !self.write {
            return true;
        }
        self.store_document(entity, fields, language).await
    }

    /// Encode and upsert a variant regardless of the write-through toggle
    ///
    /// An entity without a modification timestamp no longer exists in the
    /// backing store; its documents are invalidated instead.
    pub async fn store_document(
        &self,
        entity: &dyn ContentEntity,
        fields: &FieldMap,
        language: Option<&str>,
    ) -> bool {
        let Some(modified) = entity.modified(language).await else {
            debug!("'{}' has no content, invalidating", entity.id());
            self.invalidate(entity).await;
            return false;
        };

        let kind = match entity.kind_meta(language).await {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Skipping '{}': {}", entity.id(), e);
                return false;
            }
        };

        let content = match self.content_collection().await {
            Ok(content) => content,
            Err(e) => {
                warn!("Cache write failed for '{}': {}", entity.id(), e);
                return false;
            }
        };

        let meta = Metadata {
            id: entity.id().to_string(),
            modified,
            class_name: entity.class_name().to_string(),
            language: self.languages.resolve(language),
            kind,
        };
        let schema = entity.schema().await;
        let resolver =
            StoreReferenceResolver::new(content.clone(), self.languages.is_multilingual());
        let doc = self
            .codec
            .encode(fields, meta, schema.as_deref(), &resolver)
            .await;

        let key = self.key(entity, language);
        match content.upsert(key.as_str(), doc).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache write failed for '{}': {}", entity.id(), e);
                false
            }
        }
    }

    /// Remove every cached variant of an entity and mark it pending deletion
    ///
    /// Covers every language variant and the variant-less key. Idempotent.
    pub async fn invalidate(&self, entity: &dyn ContentEntity) -> bool {
        self.pending().insert(entity.id().to_string());

        let mut keys: Vec<Value> = self
            .languages
            .variants()
            .iter()
            .map(|language| Value::from(self.key(entity, language.as_deref()).into_string()))
            .collect();
        keys.push(Value::from(CacheKey::derive(entity.id(), None).into_string()));

        let filter = Filter::Or(vec![
            Filter::eq(fields::ID, entity.id()),
            Filter::is_in(fields::PRIMARY_KEY, keys),
        ]);

        let deleted = match self.content_collection().await {
            Ok(content) => content.delete_many(&filter).await,
            Err(e) => Err(e),
        };
        match deleted {
            Ok(count) => {
                debug!("Invalidated {} documents of '{}'", count, entity.id());
                true
            }
            Err(e) => {
                warn!("Failed to invalidate '{}': {}", entity.id(), e);
                false
            }
        }
    }

    /// Hook for entities deleted outside the gateway
    pub async fn on_entity_deleted(&self, entity: &dyn ContentEntity) -> bool {
        self.invalidate(entity).await
    }

    /// Delete from the backing store, then invalidate
    pub async fn delete(&self, entity: &dyn ContentEntity, force: bool) -> Result<bool> {
        entity.delete(force).await?;
        Ok(self.invalidate(entity).await)
    }
}
