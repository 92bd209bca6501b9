//! Command implementations

use anyhow::{Context, Result};
use khulan_sdk::{ContentEntity, Khulan};
use std::sync::Arc;

pub async fn reindex(khulan: &Khulan, passes: usize) -> Result<()> {
    let report = khulan.indexer().reindex_all(passes).await?;
    println!("{}", report);
    Ok(())
}

pub async fn flush(khulan: &Khulan) -> Result<()> {
    khulan.indexer().flush_all().await?;
    println!("Flushed content collection");
    Ok(())
}

/// JSON objects are filters; anything else is a single-entity key
pub async fn find(khulan: &Khulan, query: &str) -> Result<()> {
    let facade = khulan.query();

    if query.trim_start().starts_with('{') {
        let filter: serde_json::Value =
            serde_json::from_str(query).context("Failed to parse filter as JSON")?;
        let models = facade.find_json(&filter).await?;
        if models.is_empty() {
            println!("No entities found");
        }
        for entity in models.entities() {
            print_entity(entity);
        }
    } else {
        match facade.find_one(query).await? {
            Some(entity) => print_entity(&entity),
            None => println!("No entity found for '{}'", query),
        }
    }
    Ok(())
}

fn print_entity(entity: &Arc<dyn ContentEntity>) {
    println!("{}\t{}", entity.kind(), entity.id());
}

pub async fn cache_clean(khulan: &Khulan) -> Result<()> {
    let removed = khulan
        .cache()
        .clean(chrono::Utc::now().timestamp())
        .await
        .context("Failed to clean key-value cache")?;
    println!("Removed {} expired entries", removed);
    Ok(())
}

pub async fn cache_flush(khulan: &Khulan) -> Result<()> {
    if !khulan.cache().flush().await {
        anyhow::bail!("Failed to flush key-value cache");
    }
    println!("Flushed key-value cache");
    Ok(())
}

pub async fn cache_benchmark(khulan: &Khulan, count: usize) -> Result<()> {
    let elapsed = khulan.cache().benchmark(count).await;
    println!("Benchmark: {} keys in {:.2}s", count, elapsed.as_secs_f64());
    Ok(())
}
