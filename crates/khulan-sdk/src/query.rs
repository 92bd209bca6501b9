//! Query facade
//!
//! Queries run directly against the content collection. Matching documents
//! are projected down to the fields needed to find the live entity again and
//! resolved through a [`ModelResolver`].

use async_trait::async_trait;
use khulan_core::entity::fields;
use khulan_core::{Document, EntityKind, Value};
use khulan_repository::{ContentEntity, ContentSource};
use khulan_store::{DocumentStore, Filter, FindOptions, StoreClient};
use serde_json::Value as Json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, SdkError};

/// Projection used when resolving documents to entities
pub const MODEL_FIELDS: [&str; 3] = [fields::ID, fields::UUID, fields::MODEL_TYPE];

/// Turns a projected document back into a live entity
#[async_trait]
pub trait ModelResolver: Send + Sync {
    async fn resolve(&self, doc: &Document) -> Option<Arc<dyn ContentEntity>>;
}

/// Resolves documents against a content source, dispatching on `modelType`
pub struct SourceModelResolver {
    source: Arc<dyn ContentSource>,
}

impl SourceModelResolver {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl ModelResolver for SourceModelResolver {
    async fn resolve(&self, doc: &Document) -> Option<Arc<dyn ContentEntity>> {
        let kind: EntityKind = doc.get(fields::MODEL_TYPE)?.as_str()?.parse().ok()?;
        let id = doc.get(fields::ID).and_then(Value::as_str);
        let uuid = doc.get(fields::UUID).and_then(Value::as_str);

        let found = match (kind, id) {
            (EntityKind::Site, _) => self.source.site().await.map(Some),
            (kind, Some(id)) => self.source.find(kind, id).await,
            (_, None) => Ok(None),
        };
        let found = match (found, kind, uuid) {
            // Pages are looked up by id first, then by uuid
            (Ok(None), EntityKind::Page, Some(uuid)) => {
                self.source.find_by_uuid(EntityKind::Page, uuid).await
            }
            (found, _, _) => found,
        };

        match found {
            Ok(entity) => entity,
            Err(e) => {
                warn!("Failed to resolve {} document: {}", kind, e);
                None
            }
        }
    }
}

/// Entities returned by a multi-document query
///
/// Homogeneous results keep their kind; anything else is `Mixed`.
#[derive(Clone)]
pub enum ModelCollection {
    Pages(Vec<Arc<dyn ContentEntity>>),
    Files(Vec<Arc<dyn ContentEntity>>),
    Users(Vec<Arc<dyn ContentEntity>>),
    Sites(Vec<Arc<dyn ContentEntity>>),
    Mixed(Vec<Arc<dyn ContentEntity>>),
}

impl ModelCollection {
    pub fn empty() -> Self {
        ModelCollection::Mixed(Vec::new())
    }

    pub fn from_entities(entities: Vec<Arc<dyn ContentEntity>>) -> Self {
        let Some(first) = entities.first().map(|e| e.kind()) else {
            return Self::empty();
        };
        if entities.iter().any(|e| e.kind() != first) {
            return ModelCollection::Mixed(entities);
        }
        match first {
            EntityKind::Page => ModelCollection::Pages(entities),
            EntityKind::File => ModelCollection::Files(entities),
            EntityKind::User => ModelCollection::Users(entities),
            EntityKind::Site => ModelCollection::Sites(entities),
        }
    }

    /// Kind shared by every entity, `None` for mixed or empty collections
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            ModelCollection::Pages(_) => Some(EntityKind::Page),
            ModelCollection::Files(_) => Some(EntityKind::File),
            ModelCollection::Users(_) => Some(EntityKind::User),
            ModelCollection::Sites(_) => Some(EntityKind::Site),
            ModelCollection::Mixed(_) => None,
        }
    }

    pub fn entities(&self) -> &[Arc<dyn ContentEntity>] {
        match self {
            ModelCollection::Pages(e)
            | ModelCollection::Files(e)
            | ModelCollection::Users(e)
            | ModelCollection::Sites(e)
            | ModelCollection::Mixed(e) => e,
        }
    }

    pub fn into_entities(self) -> Vec<Arc<dyn ContentEntity>> {
        match self {
            ModelCollection::Pages(e)
            | ModelCollection::Files(e)
            | ModelCollection::Users(e)
            | ModelCollection::Sites(e)
            | ModelCollection::Mixed(e) => e,
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entities().iter().map(|e| e.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.entities().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities().is_empty()
    }
}

impl std::fmt::Debug for ModelCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCollection")
            .field("kind", &self.kind())
            .field("ids", &self.ids())
            .finish()
    }
}

/// Query entry point
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// The raw content collection
    Collection,
    /// A single entity by `_id`, `id`, `uuid` or `email`
    Key(String),
    /// A Mongo-style filter document
    Filter(Json),
}

/// Result of [`QueryFacade::query`]
pub enum QueryResult {
    Collection(Arc<dyn DocumentStore>),
    Entity(Option<Arc<dyn ContentEntity>>),
    Models(ModelCollection),
}

/// Lookups against the content collection
pub struct QueryFacade {
    client: Arc<StoreClient>,
    resolver: Arc<dyn ModelResolver>,
    projection: Vec<String>,
}

impl QueryFacade {
    pub fn new(client: Arc<StoreClient>, resolver: Arc<dyn ModelResolver>) -> Self {
        Self {
            client,
            resolver,
            projection: MODEL_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Project additional fields; the model fields are always kept
    pub fn with_projection<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in extra {
            let field = field.into();
            if !self.projection.contains(&field) {
                self.projection.push(field);
            }
        }
        self
    }

    pub fn projection(&self) -> &[String] {
        &self.projection
    }

    async fn content(&self) -> Result<Arc<dyn DocumentStore>> {
        Ok(self.client.content_collection().await?)
    }

    /// Filter matching a document by primary key, id, uuid or email
    pub fn key_filter(key: &str) -> Filter {
        Filter::Or(vec![
            Filter::eq(fields::PRIMARY_KEY, key),
            Filter::eq(fields::ID, key),
            Filter::eq(fields::UUID, key),
            Filter::eq(fields::EMAIL, key),
        ])
    }

    /// First entity whose document matches `key`
    pub async fn find_one(&self, key: &str) -> Result<Option<Arc<dyn ContentEntity>>> {
        let doc = self
            .content()
            .await?
            .find_one(&Self::key_filter(key), Some(self.projection.as_slice()))
            .await?;
        match doc {
            Some(doc) => Ok(self.resolver.resolve(&doc).await),
            None => Ok(None),
        }
    }

    /// Every entity whose document matches `filter`
    ///
    /// An entity matching in several language variants is returned once.
    /// Documents whose entity cannot be resolved are skipped.
    pub async fn find(&self, filter: &Filter) -> Result<ModelCollection> {
        let options = FindOptions::new().with_projection(self.projection.iter().cloned());
        let docs = self.content().await?.find(filter, &options).await?;

        let mut seen = HashSet::new();
        let mut entities = Vec::with_capacity(docs.len());
        for doc in &docs {
            match self.resolver.resolve(doc).await {
                Some(entity) => {
                    if seen.insert((entity.kind(), entity.id().to_string())) {
                        entities.push(entity);
                    }
                }
                None => debug!("Skipping unresolvable document {:?}", doc.get(fields::ID)),
            }
        }
        Ok(ModelCollection::from_entities(entities))
    }

    /// [`find`](Self::find) with a JSON filter document
    pub async fn find_json(&self, filter: &Json) -> Result<ModelCollection> {
        let filter = Filter::from_json(filter)
            .map_err(|e| SdkError::InvalidQuery(e.to_string()))?;
        self.find(&filter).await
    }

    pub async fn query(&self, query: Query) -> Result<QueryResult> {
        match query {
            Query::Collection => Ok(QueryResult::Collection(self.content().await?)),
            Query::Key(key) => Ok(QueryResult::Entity(self.find_one(&key).await?)),
            Query::Filter(filter) => Ok(QueryResult::Models(self.find_json(&filter).await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khulan_core::{FieldMap, KindMeta, SchemaLookup};
    use khulan_repository::RepositoryResult;

    struct Stub(EntityKind, &'static str);

    #[async_trait]
    impl ContentEntity for Stub {
        fn id(&self) -> &str {
            self.1
        }
        fn kind(&self) -> EntityKind {
            self.0
        }
        fn class_name(&self) -> &str {
            "Stub"
        }
        async fn uuid(&self) -> Option<String> {
            None
        }
        async fn kind_meta(&self, _language: Option<&str>) -> RepositoryResult<KindMeta> {
            Ok(KindMeta::Site)
        }
        async fn schema(&self) -> Option<Arc<dyn SchemaLookup>> {
            None
        }
        async fn read_content(&self, _language: Option<&str>) -> RepositoryResult<FieldMap> {
            Ok(FieldMap::new())
        }
        async fn write_content(&self, _fields: &FieldMap, _language: Option<&str>) -> RepositoryResult<()> {
            Ok(())
        }
        async fn delete(&self, _force: bool) -> RepositoryResult<()> {
            Ok(())
        }
        async fn modified(&self, _language: Option<&str>) -> Option<i64> {
            None
        }
    }

    fn stub(kind: EntityKind, id: &'static str) -> Arc<dyn ContentEntity> {
        Arc::new(Stub(kind, id))
    }

    #[test]
    fn test_homogeneous_collection() {
        let collection = ModelCollection::from_entities(vec![
            stub(EntityKind::File, "a/cover.jpg"),
            stub(EntityKind::File, "b/cover.jpg"),
        ]);
        assert!(matches!(collection, ModelCollection::Files(_)));
        assert_eq!(collection.ids(), vec!["a/cover.jpg", "b/cover.jpg"]);
    }

    #[test]
    fn test_mixed_collection() {
        let collection = ModelCollection::from_entities(vec![
            stub(EntityKind::Page, "a"),
            stub(EntityKind::User, "abc"),
        ]);
        assert_eq!(collection.kind(), None);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_empty_collection() {
        let collection = ModelCollection::from_entities(Vec::new());
        assert!(collection.is_empty());
        assert_eq!(collection.kind(), None);
    }

    #[test]
    fn test_projection_keeps_model_fields() {
        let facade = QueryFacade::new(
            Arc::new(StoreClient::in_memory()),
            Arc::new(SourceModelResolver::new(Arc::new(EmptySource::default()))),
        )
        .with_projection(["title", "id"]);

        assert_eq!(facade.projection(), ["id", "uuid", "modelType", "title"]);
    }

    #[derive(Default)]
    struct EmptySource(khulan_core::Languages);

    #[async_trait]
    impl ContentSource for EmptySource {
        fn languages(&self) -> &khulan_core::Languages {
            &self.0
        }
        async fn site(&self) -> RepositoryResult<Arc<dyn ContentEntity>> {
            Ok(stub(EntityKind::Site, "site"))
        }
        async fn pages(&self) -> RepositoryResult<Vec<Arc<dyn ContentEntity>>> {
            Ok(Vec::new())
        }
        async fn files(&self) -> RepositoryResult<Vec<Arc<dyn ContentEntity>>> {
            Ok(Vec::new())
        }
        async fn users(&self) -> RepositoryResult<Vec<Arc<dyn ContentEntity>>> {
            Ok(Vec::new())
        }
    }
}
