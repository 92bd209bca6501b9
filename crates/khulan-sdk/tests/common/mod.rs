//! Shared fixture: a two-language site mirrored into an in-memory store

#![allow(dead_code)]

use khulan_core::entity::fields;
use khulan_core::{CacheKey, Document, Value};
use khulan_repository::{ContentSource, FileSystemContentSource, SourceConfig};
use khulan_sdk::{Khulan, KhulanConfig};
use khulan_store::{DocumentDatabase, DocumentStore, Filter, MemoryDatabase};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;

pub struct Fixture {
    pub dir: TempDir,
    pub database: Arc<MemoryDatabase>,
    pub khulan: Khulan,
}

impl Fixture {
    pub fn content(&self) -> Arc<dyn DocumentStore> {
        self.database.collection("khulan")
    }

    pub async fn count(&self, filter: &Filter) -> u64 {
        self.content().count(filter).await.unwrap()
    }

    pub async fn document(&self, key: &CacheKey) -> Option<Document> {
        self.content()
            .find_one(&Filter::eq(fields::PRIMARY_KEY, key.as_str()), None)
            .await
            .unwrap()
    }

    pub fn path(&self, relative: &str) -> std::path::PathBuf {
        self.dir.path().join(relative)
    }
}

async fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    fs::write(path, content).await.unwrap();
}

/// Write the site to disk
///
/// `betterharder` relates to `fasterstronger`, which sorts after it, so a
/// single indexing pass cannot resolve the relation.
pub async fn create_site(root: &Path) {
    write(root, "content/site.en.yaml", "title: Discovery\n").await;
    write(root, "content/site.de.yaml", "title: Entdeckung\n").await;

    write(
        root,
        "content/1_betterharder/article.en.yaml",
        "title: Harder Better\ntags: Daft, Punk\nrelated: |\n  - page://fasterstronger\npublished: 2001-03-13\nuuid: aaa111\n",
    )
    .await;
    write(
        root,
        "content/1_betterharder/article.de.yaml",
        "title: Härter Besser\ntags: Daft, Punk\nrelated: |\n  - page://fasterstronger\npublished: 2001-03-13\n",
    )
    .await;
    write(root, "content/1_betterharder/cover.jpg", "jpeg").await;
    write(root, "content/1_betterharder/cover.jpg.en.yaml", "alt: Helmets\nsort: 1\n").await;

    write(
        root,
        "content/2_fasterstronger/article.en.yaml",
        "title: Faster Stronger\ntags: Punk\nuuid: bbb222\n",
    )
    .await;
    write(
        root,
        "content/2_fasterstronger/article.de.yaml",
        "title: Schneller Stärker\ntags: Punk\n",
    )
    .await;

    write(root, "content/about/default.en.yaml", "title: About\n").await;

    write(root, "accounts/abc123/index.yaml", "email: thomas@example.com\nname: Thomas\nrole: admin\n").await;
    write(root, "accounts/abc123/user.en.yaml", "bio: Robot\n").await;

    write(
        root,
        "blueprints/pages/article.yaml",
        "title: Article\nfields:\n  tags:\n    type: tags\n  related:\n    type: pages\n  published:\n    type: date\n",
    )
    .await;
}

pub async fn fixture_with(config: KhulanConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    create_site(dir.path()).await;

    let source_config = SourceConfig::new(dir.path().to_string_lossy()).with_languages(["en", "de"]);
    let source: Arc<dyn ContentSource> =
        Arc::new(FileSystemContentSource::from_config(&source_config).unwrap());
    let database = Arc::new(MemoryDatabase::new());

    let khulan = Khulan::builder()
        .with_config(config.with_source(source_config))
        .with_source(source)
        .with_database(database.clone())
        .build()
        .unwrap();

    Fixture {
        dir,
        database,
        khulan,
    }
}

/// Read- and write-through enabled
pub async fn fixture() -> Fixture {
    fixture_with(KhulanConfig::new().read_through(true)).await
}

pub fn string_list(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|item| Value::from(*item)).collect())
}
