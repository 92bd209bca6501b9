//! Relation resolution against the content collection

use async_trait::async_trait;
use khulan_core::entity::fields;
use khulan_core::{CacheKey, EntityUri, ReferenceResolver, Value};
use khulan_store::{DocumentStore, Filter};
use std::sync::Arc;
use tracing::warn;

/// Resolves `page://`, `file://`, `user://` and `site://` entries to the key
/// of an already indexed document
pub struct StoreReferenceResolver {
    content: Arc<dyn DocumentStore>,
    multilingual: bool,
}

impl StoreReferenceResolver {
    pub fn new(content: Arc<dyn DocumentStore>, multilingual: bool) -> Self {
        Self {
            content,
            multilingual,
        }
    }

    fn filter(&self, target: &EntityUri, language: Option<&str>) -> Filter {
        let identity = Filter::Or(vec![
            Filter::eq(fields::ID, target.id.as_str()),
            Filter::eq(fields::UUID, target.id.as_str()),
        ]);
        match language {
            Some(code) if self.multilingual => {
                Filter::And(vec![identity, Filter::eq(fields::LANGUAGE, code)])
            }
            _ => identity,
        }
    }
}

#[async_trait]
impl ReferenceResolver for StoreReferenceResolver {
    async fn resolve(&self, target: &EntityUri, language: Option<&str>) -> Option<CacheKey> {
        let projection = [fields::PRIMARY_KEY.to_string()];
        let found = self
            .content
            .find_one(&self.filter(target, language), Some(&projection[..]))
            .await;

        match found {
            Ok(doc) => doc
                .as_ref()
                .and_then(|doc| doc.get(fields::PRIMARY_KEY))
                .and_then(Value::as_str)
                .map(CacheKey::from_raw),
            Err(e) => {
                warn!("Failed to resolve {}: {}", target.to_uri(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khulan_core::{Document, EntityKind};
    use khulan_store::{DocumentDatabase, MemoryDatabase};

    fn doc(id: &str, uuid: &str, language: &str) -> Document {
        Document::from([
            (fields::ID.to_string(), Value::from(id)),
            (fields::UUID.to_string(), Value::from(uuid)),
            (fields::LANGUAGE.to_string(), Value::from(language)),
        ])
    }

    async fn setup(multilingual: bool) -> StoreReferenceResolver {
        let database = MemoryDatabase::new();
        let content = database.collection("khulan");
        for language in ["en", "de"] {
            let key = CacheKey::derive("fasterstronger", Some(language));
            content
                .upsert(key.as_str(), doc("fasterstronger", "f00d", language))
                .await
                .unwrap();
        }
        StoreReferenceResolver::new(content, multilingual)
    }

    fn uri(id: &str) -> EntityUri {
        EntityUri {
            kind: EntityKind::Page,
            id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_by_id_and_uuid_per_language() {
        let resolver = setup(true).await;

        assert_eq!(
            resolver.resolve(&uri("fasterstronger"), Some("de")).await,
            Some(CacheKey::derive("fasterstronger", Some("de")))
        );
        assert_eq!(
            resolver.resolve(&uri("f00d"), Some("en")).await,
            Some(CacheKey::derive("fasterstronger", Some("en")))
        );
        assert_eq!(resolver.resolve(&uri("missing"), Some("en")).await, None);
    }

    #[tokio::test]
    async fn test_language_ignored_on_single_language_sites() {
        let resolver = setup(false).await;
        assert!(resolver.resolve(&uri("fasterstronger"), Some("fr")).await.is_some());
    }
}
