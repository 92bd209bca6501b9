//! Cache-aware entity handle

use khulan_core::{CacheKey, EntityKind, FieldMap};
use khulan_repository::ContentEntity;
use std::sync::Arc;

use crate::error::Result;
use crate::gateway::CacheGateway;

/// An entity whose reads, writes and deletes go through the cache gateway
#[derive(Clone)]
pub struct CachedEntity {
    inner: Arc<dyn ContentEntity>,
    gateway: Arc<CacheGateway>,
}

impl CachedEntity {
    pub fn new(inner: Arc<dyn ContentEntity>, gateway: Arc<CacheGateway>) -> Self {
        Self { inner, gateway }
    }

    pub fn id(&self) -> &str {
        self.inner.id()
    }

    pub fn kind(&self) -> EntityKind {
        self.inner.kind()
    }

    /// The wrapped backing-store entity
    pub fn entity(&self) -> &Arc<dyn ContentEntity> {
        &self.inner
    }

    pub fn key(&self, language: Option<&str>) -> CacheKey {
        self.gateway.key(self.inner.as_ref(), language)
    }

    pub async fn content(&self, language: Option<&str>) -> Result<FieldMap> {
        self.gateway.read_content(self.inner.as_ref(), language).await
    }

    pub async fn update(&self, fields: &FieldMap, language: Option<&str>) -> bool {
        self.gateway
            .write_content(self.inner.as_ref(), fields, language)
            .await
    }

    /// Re-read a variant from the backing store and store it, ignoring the
    /// write-through toggle
    pub async fn refresh(&self, language: Option<&str>) -> Result<bool> {
        let fields = self.inner.read_content(language).await?;
        Ok(self
            .gateway
            .store_document(self.inner.as_ref(), &fields, language)
            .await)
    }

    pub async fn delete(&self, force: bool) -> Result<bool> {
        self.gateway.delete(self.inner.as_ref(), force).await
    }
}

impl std::fmt::Debug for CachedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedEntity")
            .field("kind", &self.inner.kind())
            .field("id", &self.inner.id())
            .finish()
    }
}
