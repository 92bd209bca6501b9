//! Backing store contract
//!
//! - [`ContentEntity`]: one page, file, user or the site, with per-language content
//! - [`ContentSource`]: enumerates and looks up entities
//!
//! The backing store is the source of truth; the document store only ever
//! mirrors it.

use async_trait::async_trait;
use khulan_core::{EntityKind, FieldMap, KindMeta, Languages, SchemaLookup};
use std::sync::Arc;

use crate::RepositoryResult;

/// An entity of the content model
#[async_trait]
pub trait ContentEntity: Send + Sync {
    /// Stable id, e.g. `blog/hello-world` or `blog/hello-world/cover.jpg`
    fn id(&self) -> &str;

    fn kind(&self) -> EntityKind;

    /// Model class name stored as `class`
    fn class_name(&self) -> &str;

    /// Whether bulk indexing includes this entity
    fn is_cacheable(&self) -> bool {
        true
    }

    /// Universal id, when the entity has one
    async fn uuid(&self) -> Option<String>;

    /// Kind-specific metadata for a language variant
    async fn kind_meta(&self, language: Option<&str>) -> RepositoryResult<KindMeta>;

    /// Field-type lookup for this entity's content
    async fn schema(&self) -> Option<Arc<dyn SchemaLookup>>;

    /// Content of a language variant; empty when the variant has no content
    async fn read_content(&self, language: Option<&str>) -> RepositoryResult<FieldMap>;

    /// Replace the content of a language variant
    async fn write_content(&self, fields: &FieldMap, language: Option<&str>) -> RepositoryResult<()>;

    /// Delete the entity; pages with children require `force`
    async fn delete(&self, force: bool) -> RepositoryResult<()>;

    /// Unix seconds of the last modification of a variant, `None` when it has no content
    async fn modified(&self, language: Option<&str>) -> Option<i64>;
}

/// The whole content model
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn languages(&self) -> &Languages;

    async fn site(&self) -> RepositoryResult<Arc<dyn ContentEntity>>;

    /// Every page, drafts included
    async fn pages(&self) -> RepositoryResult<Vec<Arc<dyn ContentEntity>>>;

    /// Every file of every page and of the site
    async fn files(&self) -> RepositoryResult<Vec<Arc<dyn ContentEntity>>>;

    async fn users(&self) -> RepositoryResult<Vec<Arc<dyn ContentEntity>>>;

    /// Pages, files and users; the site is not part of the bulk index
    async fn entities(&self) -> RepositoryResult<Vec<Arc<dyn ContentEntity>>> {
        let mut entities = self.pages().await?;
        entities.extend(self.files().await?);
        entities.extend(self.users().await?);
        Ok(entities)
    }

    /// Look up an entity by kind and id
    async fn find(&self, kind: EntityKind, id: &str) -> RepositoryResult<Option<Arc<dyn ContentEntity>>> {
        let candidates = match kind {
            EntityKind::Site => return Ok(Some(self.site().await?)),
            EntityKind::Page => self.pages().await?,
            EntityKind::File => self.files().await?,
            EntityKind::User => self.users().await?,
        };
        Ok(candidates.into_iter().find(|entity| entity.id() == id))
    }

    /// Look up an entity by kind and uuid
    async fn find_by_uuid(
        &self,
        kind: EntityKind,
        uuid: &str,
    ) -> RepositoryResult<Option<Arc<dyn ContentEntity>>> {
        let candidates = match kind {
            EntityKind::Site => vec![self.site().await?],
            EntityKind::Page => self.pages().await?,
            EntityKind::File => self.files().await?,
            EntityKind::User => self.users().await?,
        };
        for entity in candidates {
            if entity.uuid().await.as_deref() == Some(uuid) {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }
}
