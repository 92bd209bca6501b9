//! Integration tests for KeyValueCache

use khulan_core::{Document, Value};
use khulan_store::{
    DocumentDatabase, DocumentStore, Filter, KeyValueCache, MemoryDatabase, StoreClient,
    StoreConfig,
};
use std::sync::Arc;

fn setup(debug: bool, auto_clean: bool) -> (Arc<MemoryDatabase>, KeyValueCache) {
    let database = Arc::new(MemoryDatabase::new());
    let client = StoreClient::with_database(StoreConfig::memory(), debug, database.clone());
    (database, KeyValueCache::new(Arc::new(client), auto_clean))
}

/// Write an entry that expired an hour ago, bypassing the cache API
async fn insert_expired(database: &MemoryDatabase, key: &str) {
    let now = chrono::Utc::now().timestamp();
    let doc = Document::from([
        ("value".to_string(), Value::from("old")),
        ("created_at".to_string(), Value::Int(now - 7200)),
        ("minutes".to_string(), Value::Int(60)),
        ("expires_at".to_string(), Value::Int(now - 3600)),
    ]);
    database
        .collection("cache")
        .upsert(KeyValueCache::key(key).as_str(), doc)
        .await
        .unwrap();
}

async fn cache_size(database: &MemoryDatabase) -> u64 {
    database.collection("cache").count(&Filter::All).await.unwrap()
}

#[tokio::test]
async fn test_set_and_get() {
    let (database, cache) = setup(false, false);

    assert!(cache.set("greeting", "hello", 10).await);
    assert_eq!(cache.get("greeting", Value::Null).await, Value::from("hello"));
    assert_eq!(cache.get("missing", Value::from("default")).await, Value::from("default"));

    // Stored under the hashed key with the expiry envelope
    let doc = database
        .collection("cache")
        .find_one(&Filter::eq("_id", KeyValueCache::key("greeting").into_string()), None)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(doc["expires_at"], Value::Int(_)));
    assert_eq!(doc["minutes"], Value::Int(10));
}

#[tokio::test]
async fn test_structured_values() {
    let (_database, cache) = setup(false, false);
    let value = Value::Array(vec![Value::from("Daft"), Value::Int(2)]);

    cache.set("list", value.clone(), 0).await;
    assert_eq!(cache.get("list", Value::Null).await, value);
}

#[tokio::test]
async fn test_debug_mode_bypasses_reads() {
    let (database, cache) = setup(true, false);

    assert!(cache.set("greeting", "hello", 10).await);
    assert_eq!(cache_size(&database).await, 1);
    assert_eq!(
        cache.get("greeting", Value::from("default")).await,
        Value::from("default")
    );
    assert!(!cache.exists("greeting").await);
}

#[tokio::test]
async fn test_expired_entry_returns_default_and_is_removed() {
    let (database, cache) = setup(false, false);
    insert_expired(&database, "stale").await;

    assert_eq!(cache.get("stale", Value::from("fresh")).await, Value::from("fresh"));
    assert_eq!(cache_size(&database).await, 0);
}

#[tokio::test]
async fn test_clean_removes_only_expired_entries() {
    let (database, cache) = setup(false, false);
    insert_expired(&database, "stale").await;
    cache.set("forever", "kept", 0).await;
    cache.set("later", "kept", 60).await;

    let removed = cache.clean(chrono::Utc::now().timestamp()).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(cache_size(&database).await, 2);
}

#[tokio::test]
async fn test_auto_clean_runs_once() {
    let (database, cache) = setup(false, true);
    insert_expired(&database, "stale-1").await;

    cache.get("other", Value::Null).await;
    assert_eq!(cache_size(&database).await, 0);

    insert_expired(&database, "stale-2").await;
    cache.get("other", Value::Null).await;
    assert_eq!(cache_size(&database).await, 1);
}

#[tokio::test]
async fn test_get_or_set() {
    let (_database, cache) = setup(false, false);

    let first = cache
        .get_or_set("answer", 5, || async { Value::Int(42) })
        .await;
    let second = cache
        .get_or_set("answer", 5, || async { Value::Int(0) })
        .await;

    assert_eq!(first, Value::Int(42));
    assert_eq!(second, Value::Int(42));
}

#[tokio::test]
async fn test_remove_and_flush() {
    let (database, cache) = setup(false, false);
    cache.set("a", "1", 0).await;
    cache.set("b", "2", 0).await;
    cache.set("c", "3", 0).await;

    assert!(cache.remove("a").await);
    assert_eq!(cache.get("a", Value::Null).await, Value::Null);
    assert_eq!(cache_size(&database).await, 2);

    assert!(cache.flush().await);
    assert_eq!(cache_size(&database).await, 0);
}

#[tokio::test]
async fn test_benchmark_leaves_no_keys_behind() {
    let (database, cache) = setup(false, false);
    cache.set("kept", "value", 0).await;

    cache.benchmark(10).await;

    assert_eq!(cache_size(&database).await, 1);
    assert_eq!(cache.get("kept", Value::Null).await, Value::from("value"));
}

#[tokio::test]
async fn test_benchmark_with_no_keys() {
    let (database, cache) = setup(false, false);
    cache.benchmark(0).await;
    assert_eq!(cache_size(&database).await, 0);
}
