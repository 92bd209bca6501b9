//! Generic key-value cache stored in the cache collection
//!
//! Entries are stored under the hashed key as
//! `{value, created_at, minutes, expires_at}` where `expires_at` is null for
//! entries that never expire. Store failures never surface to callers: reads
//! fall back to the default and writes report `false`.

use chrono::Utc;
use khulan_core::entity::fields;
use khulan_core::{CacheKey, Document, Value};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::client::StoreClient;
use crate::filter::Filter;
use crate::StoreResult;

const VALUE: &str = "value";
const CREATED_AT: &str = "created_at";
const MINUTES: &str = "minutes";
const EXPIRES_AT: &str = "expires_at";

const BENCHMARK_PREFIX: &str = "khulan-benchmark-";
const BENCHMARK_VALUE_LEN: usize = 1000;

/// A cached value with its expiry envelope
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    /// Unix seconds
    pub created_at: i64,
    /// Lifetime in minutes, 0 for entries that never expire
    pub minutes: i64,
    /// Unix seconds, `None` for entries that never expire
    pub expires_at: Option<i64>,
}

impl CacheEntry {
    pub fn new(value: Value, minutes: i64, now: i64) -> Self {
        let expires_at = (minutes > 0).then(|| now + minutes * 60);
        Self {
            value,
            created_at: now,
            minutes,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at < now)
    }

    fn into_document(self) -> Document {
        Document::from([
            (VALUE.to_string(), self.value),
            (CREATED_AT.to_string(), Value::Int(self.created_at)),
            (MINUTES.to_string(), Value::Int(self.minutes)),
            (EXPIRES_AT.to_string(), Value::from(self.expires_at)),
        ])
    }

    fn from_document(mut doc: Document) -> Self {
        let int = |doc: &Document, key: &str| doc.get(key).and_then(Value::as_i64);
        Self {
            created_at: int(&doc, CREATED_AT).unwrap_or_default(),
            minutes: int(&doc, MINUTES).unwrap_or_default(),
            expires_at: int(&doc, EXPIRES_AT),
            value: doc.remove(VALUE).unwrap_or(Value::Null),
        }
    }
}

/// Key-value cache over the cache collection
pub struct KeyValueCache {
    client: Arc<StoreClient>,
    auto_clean: bool,
    cleaned: AtomicBool,
}

impl KeyValueCache {
    /// With `auto_clean` the first read of the process purges expired entries
    pub fn new(client: Arc<StoreClient>, auto_clean: bool) -> Self {
        Self {
            client,
            auto_clean,
            cleaned: AtomicBool::new(false),
        }
    }

    /// Storage key of an opaque cache key
    pub fn key(raw: &str) -> CacheKey {
        CacheKey::hashed(raw)
    }

    fn now() -> i64 {
        Utc::now().timestamp()
    }

    fn by_key(raw: &str) -> Filter {
        Filter::eq(fields::PRIMARY_KEY, Self::key(raw).into_string())
    }

    /// Store a value; `minutes == 0` never expires
    pub async fn set(&self, key: &str, value: impl Into<Value>, minutes: i64) -> bool {
        let entry = CacheEntry::new(value.into(), minutes, Self::now());
        let result: StoreResult<()> = async {
            let collection = self.client.cache_collection().await?;
            collection
                .upsert(Self::key(key).as_str(), entry.into_document())
                .await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write cache entry '{}': {}", key, e);
                false
            }
        }
    }

    /// Raw entry lookup, expired entries included
    pub async fn retrieve(&self, key: &str) -> Option<CacheEntry> {
        if self.auto_clean && !self.cleaned.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.clean(Self::now()).await {
                warn!("Failed to clean expired cache entries: {}", e);
            }
        }

        let result = async {
            let collection = self.client.cache_collection().await?;
            collection.find_one(&Self::by_key(key), None).await
        }
        .await;

        match result {
            Ok(doc) => doc.map(CacheEntry::from_document),
            Err(e) => {
                warn!("Failed to read cache entry '{}': {}", key, e);
                None
            }
        }
    }

    /// Cached value, or `default` on miss, expiry or debug mode
    pub async fn get(&self, key: &str, default: Value) -> Value {
        if self.client.is_debug() {
            return default;
        }
        self.live_value(key).await.unwrap_or(default)
    }

    async fn live_value(&self, key: &str) -> Option<Value> {
        let entry = self.retrieve(key).await?;
        if entry.is_expired(Self::now()) {
            debug!("Cache entry '{}' expired", key);
            self.remove(key).await;
            return None;
        }
        Some(entry.value)
    }

    /// Cached value, computing and storing it on a miss
    pub async fn get_or_set<F, Fut>(&self, key: &str, minutes: i64, compute: F) -> Value
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Value>,
    {
        if !self.client.is_debug() {
            if let Some(value) = self.live_value(key).await {
                return value;
            }
        }
        let value = compute().await;
        self.set(key, value.clone(), minutes).await;
        value
    }

    pub async fn exists(&self, key: &str) -> bool {
        !self.client.is_debug() && self.live_value(key).await.is_some()
    }

    pub async fn remove(&self, key: &str) -> bool {
        let result = async {
            let collection = self.client.cache_collection().await?;
            collection.delete_one(&Self::by_key(key)).await
        }
        .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to remove cache entry '{}': {}", key, e);
                false
            }
        }
    }

    /// Delete every entry
    pub async fn flush(&self) -> bool {
        let result = async {
            let collection = self.client.cache_collection().await?;
            collection.delete_many(&Filter::All).await
        }
        .await;

        match result {
            Ok(count) => {
                debug!("Flushed {} cache entries", count);
                true
            }
            Err(e) => {
                warn!("Failed to flush cache: {}", e);
                false
            }
        }
    }

    /// Delete entries that expired before `now` (Unix seconds)
    pub async fn clean(&self, now: i64) -> StoreResult<u64> {
        let collection = self.client.cache_collection().await?;
        collection
            .delete_many(&Filter::Lt(EXPIRES_AT.to_string(), Value::Int(now)))
            .await
    }

    /// Time a set/get/remove workload over `count` keys
    ///
    /// Every key is written and read back, the keys from 60% to 80% are
    /// removed and the last 20% are written again. Benchmark keys are
    /// removed afterwards and are not part of the measured time.
    pub async fn benchmark(&self, count: usize) -> Duration {
        let keys: Vec<String> = (0..count)
            .map(|i| format!("{}{}", BENCHMARK_PREFIX, i))
            .collect();
        let values: Vec<String> = keys.iter().map(|key| benchmark_value(key)).collect();

        let started = Instant::now();
        for (key, value) in keys.iter().zip(&values) {
            self.set(key, value.as_str(), 0).await;
            self.get(key, Value::Null).await;
        }
        for key in &keys[count * 6 / 10..count * 8 / 10] {
            self.remove(key).await;
        }
        for (key, value) in keys.iter().zip(&values).skip(count * 8 / 10) {
            self.set(key, value.as_str(), 0).await;
        }
        let elapsed = started.elapsed();

        for key in &keys {
            self.remove(key).await;
        }
        info!("Benchmarked {} cache keys in {:.3}s", count, elapsed.as_secs_f64());
        elapsed
    }
}

/// Deterministic filler of `BENCHMARK_VALUE_LEN` characters
fn benchmark_value(key: &str) -> String {
    KeyValueCache::key(key)
        .as_str()
        .chars()
        .cycle()
        .take(BENCHMARK_VALUE_LEN)
        .collect()
}
