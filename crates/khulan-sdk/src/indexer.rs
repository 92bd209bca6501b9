//! Bulk (re)indexing and index provisioning

use khulan_core::entity::fields;
use khulan_core::Languages;
use khulan_repository::{ContentEntity, ContentSource};
use khulan_store::{Filter, IndexSpec, SortOrder};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::gateway::CacheGateway;

/// Number of passes that lets every relation resolve: the first pass
/// creates the documents references point at, the second resolves them
pub const DEFAULT_PASSES: usize = 2;

/// Outcome of a reindex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexReport {
    /// Documents written in the final pass
    pub count: u64,
    pub elapsed: Duration,
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Indexed {} documents in {:.2}s",
            self.count,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Secondary indexes of the content collection
///
/// `language` is part of each index only on multilingual sites.
pub fn index_specs(languages: &Languages) -> Vec<IndexSpec> {
    let with_language = |spec: IndexSpec| {
        if languages.is_multilingual() {
            spec.key(fields::LANGUAGE, SortOrder::Ascending)
        } else {
            spec
        }
    };

    vec![
        with_language(IndexSpec::new("id_language").key(fields::ID, SortOrder::Ascending)).unique(),
        with_language(IndexSpec::new("uuid_language").key(fields::UUID, SortOrder::Ascending))
            .unique(),
        with_language(
            IndexSpec::new("template_status")
                .key(fields::TEMPLATE, SortOrder::Ascending)
                .key(fields::STATUS, SortOrder::Ascending),
        )
        .key(fields::NUM, SortOrder::Ascending),
        with_language(IndexSpec::new("modified").key(fields::MODIFIED, SortOrder::Descending)),
        with_language(IndexSpec::new("email_language").key(fields::EMAIL, SortOrder::Ascending))
            .unique(),
    ]
}

/// Drives the gateway across the whole content source
pub struct Indexer {
    source: Arc<dyn ContentSource>,
    gateway: Arc<CacheGateway>,
}

impl Indexer {
    pub fn new(source: Arc<dyn ContentSource>, gateway: Arc<CacheGateway>) -> Self {
        Self { source, gateway }
    }

    /// Entities taking part in bulk indexing
    async fn eligible(&self) -> Result<Vec<Arc<dyn ContentEntity>>> {
        let entities = self.source.entities().await?;
        let total = entities.len();
        let eligible: Vec<_> = entities
            .into_iter()
            .filter(|entity| entity.is_cacheable())
            .collect();
        if eligible.len() < total {
            debug!("{} entities opted out of indexing", total - eligible.len());
        }
        Ok(eligible)
    }

    /// Write every variant of every eligible entity, `passes` times
    ///
    /// Relations only resolve against documents that already exist, so a
    /// single pass leaves forward references unresolved. Writes ignore the
    /// write-through toggle.
    pub async fn reindex_all(&self, passes: usize) -> Result<IndexReport> {
        let start = Instant::now();
        let entities = self.eligible().await?;
        let variants = self.gateway.languages().variants();
        let passes = passes.max(1);

        let mut count = 0;
        for pass in 1..=passes {
            count = 0;
            for entity in &entities {
                for language in &variants {
                    let language = language.as_deref();
                    let content = match entity.read_content(language).await {
                        Ok(content) => content,
                        Err(e) => {
                            warn!("Skipping '{}': {}", entity.id(), e);
                            continue;
                        }
                    };
                    if self
                        .gateway
                        .store_document(entity.as_ref(), &content, language)
                        .await
                    {
                        count += 1;
                    }
                }
            }
            debug!("Reindex pass {}/{} wrote {} documents", pass, passes, count);
        }

        self.ensure_indexes().await?;

        let report = IndexReport {
            count,
            elapsed: start.elapsed(),
        };
        info!("{}", report);
        Ok(report)
    }

    /// Create the secondary indexes of the content collection
    pub async fn ensure_indexes(&self) -> Result<()> {
        let content = self.gateway.content_collection().await?;
        for spec in index_specs(self.gateway.languages()) {
            content.create_index(spec).await?;
        }
        Ok(())
    }

    /// Drop the whole content collection
    pub async fn flush_all(&self) -> Result<()> {
        let content = self.gateway.content_collection().await?;
        content.drop_collection().await?;
        info!("Flushed content collection '{}'", content.name());
        Ok(())
    }

    /// Index everything when caching is enabled and the collection is empty
    pub async fn ensure_populated(&self) -> Result<Option<IndexReport>> {
        if !self.gateway.is_read_enabled() && !self.gateway.is_write_enabled() {
            return Ok(None);
        }
        let content = self.gateway.content_collection().await?;
        if content.count(&Filter::All).await? > 0 {
            return Ok(None);
        }
        info!("Content collection is empty, indexing");
        Ok(Some(self.reindex_all(DEFAULT_PASSES).await?))
    }
}
