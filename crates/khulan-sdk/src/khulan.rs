//! Khulan entry point

use khulan_core::EntityKind;
use khulan_repository::{ContentEntity, ContentSource};
use khulan_store::{KeyValueCache, StoreClient};
use std::sync::Arc;

use crate::builder::KhulanBuilder;
use crate::config::KhulanConfig;
use crate::entity::CachedEntity;
use crate::error::Result;
use crate::gateway::CacheGateway;
use crate::indexer::{IndexReport, Indexer};
use crate::query::{QueryFacade, SourceModelResolver};

/// Content cache over a content source and a document store
///
/// Entities obtained through [`Khulan::cached`] read, write and delete
/// through the cache gateway.
pub struct Khulan {
    pub(crate) config: KhulanConfig,
    pub(crate) client: Arc<StoreClient>,
    pub(crate) source: Arc<dyn ContentSource>,
    pub(crate) gateway: Arc<CacheGateway>,
    pub(crate) cache: Arc<KeyValueCache>,
}

impl Khulan {
    pub fn builder() -> KhulanBuilder {
        KhulanBuilder::new()
    }

    pub fn config(&self) -> &KhulanConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<StoreClient> {
        &self.client
    }

    pub fn source(&self) -> &Arc<dyn ContentSource> {
        &self.source
    }

    pub fn gateway(&self) -> &Arc<CacheGateway> {
        &self.gateway
    }

    /// Generic key-value cache sharing the store client
    pub fn cache(&self) -> &Arc<KeyValueCache> {
        &self.cache
    }

    /// Wrap an entity so its content goes through the cache
    pub fn cached(&self, entity: Arc<dyn ContentEntity>) -> CachedEntity {
        CachedEntity::new(entity, self.gateway.clone())
    }

    /// Look up an entity in the content source by kind and id
    pub async fn entity(&self, kind: EntityKind, id: &str) -> Result<Option<CachedEntity>> {
        Ok(self
            .source
            .find(kind, id)
            .await?
            .map(|entity| self.cached(entity)))
    }

    pub async fn page(&self, id: &str) -> Result<Option<CachedEntity>> {
        self.entity(EntityKind::Page, id).await
    }

    pub async fn site(&self) -> Result<CachedEntity> {
        Ok(self.cached(self.source.site().await?))
    }

    pub fn indexer(&self) -> Indexer {
        Indexer::new(self.source.clone(), self.gateway.clone())
    }

    pub fn query(&self) -> QueryFacade {
        QueryFacade::new(
            self.client.clone(),
            Arc::new(SourceModelResolver::new(self.source.clone())),
        )
    }

    /// Single-entity lookup by `_id`, `id`, `uuid` or `email`
    pub async fn find_one(&self, key: &str) -> Result<Option<CachedEntity>> {
        Ok(self
            .query()
            .find_one(key)
            .await?
            .map(|entity| self.cached(entity)))
    }

    /// Startup hook: index everything when the content collection is empty
    pub async fn ensure_populated(&self) -> Result<Option<IndexReport>> {
        self.indexer().ensure_populated().await
    }
}
