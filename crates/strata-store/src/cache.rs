//! Listing cache.
//!
//! Memoizes flat identifier listings under stable string keys:
//! - Snapshots are immutable; a refresh publishes a new one wholesale
//! - Concurrent misses on the same key collapse into a single fetch
//! - A blob side-cache keeps per-resource documents next to the listing

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use strata_core::Timestamp;
use tracing::debug;

use crate::config::CacheConfig;

/// An immutable, timestamped set of identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSnapshot {
    identifiers: Vec<String>,
    fetched_at: Timestamp,
}

impl ListingSnapshot {
    /// Creates a snapshot, collapsing duplicates and keeping first occurrences.
    pub fn new(identifiers: Vec<String>, fetched_at: Timestamp) -> Self {
        let mut seen = std::collections::HashSet::with_capacity(identifiers.len());
        let identifiers = identifiers
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Self {
            identifiers,
            fetched_at,
        }
    }

    /// Returns the identifiers in provider order.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Returns when the listing was obtained.
    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    /// Returns true if the identifier is present (case-sensitive).
    pub fn contains(&self, id: &str) -> bool {
        self.identifiers.iter().any(|candidate| candidate == id)
    }

    /// Returns the number of identifiers.
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Returns true if the listing is empty.
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

/// Cache statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a fresh snapshot
    pub hits: u64,
    /// Lookups that had to wait for or run a fetch
    pub misses: u64,
    /// Fetches actually executed
    pub fetches: u64,
}

/// A published listing.
struct Published {
    snapshot: Arc<ListingSnapshot>,
    stored_at: Instant,
    generation: u64,
}

/// A cached document.
struct BlobEntry {
    data: Bytes,
    stored_at: Instant,
    updated: Timestamp,
}

/// Single-flight listing cache.
pub struct ListingCache {
    config: CacheConfig,
    /// Published snapshots by key
    listings: RwLock<HashMap<String, Published>>,
    /// Cached documents by key
    blobs: RwLock<HashMap<String, BlobEntry>>,
    /// Per-key fetch gates
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    /// Publication counter
    generation: AtomicU64,
    /// Statistics
    stats: RwLock<CacheStats>,
}

impl ListingCache {
    /// Creates a new cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            listings: RwLock::new(HashMap::new()),
            blobs: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(1),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Creates a cache with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the cached listing for `key`, running `fetch` on a miss.
    ///
    /// Concurrent callers missing on the same key wait for one fetch and
    /// share its result. A failed fetch is returned to the caller that ran
    /// it and nothing is cached.
    pub async fn cached_strings<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
    ) -> Result<Arc<ListingSnapshot>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, E>>,
    {
        if let Some(snapshot) = self.fresh(key) {
            self.stats.write().hits += 1;
            return Ok(snapshot);
        }
        self.stats.write().misses += 1;

        let seen = self.published_generation(key);
        let gate = self.gate(key);
        let _guard = gate.lock().await;

        // Another caller may have published while we waited on the gate.
        if let Some(snapshot) = self.fresh(key) {
            return Ok(snapshot);
        }
        if let Some(snapshot) = self.published_since(key, seen) {
            return Ok(snapshot);
        }

        debug!(key = %key, "Fetching listing");
        self.stats.write().fetches += 1;
        let identifiers = fetch().await?;

        let snapshot = Arc::new(ListingSnapshot::new(identifiers, Timestamp::now()));
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        self.listings.write().insert(
            key.to_string(),
            Published {
                snapshot: snapshot.clone(),
                stored_at: Instant::now(),
                generation,
            },
        );
        debug!(key = %key, count = snapshot.len(), "Published listing");
        Ok(snapshot)
    }

    /// Returns the published snapshot for `key`, fresh or not.
    pub fn peek(&self, key: &str) -> Option<Arc<ListingSnapshot>> {
        self.listings.read().get(key).map(|p| p.snapshot.clone())
    }

    /// Stores a document under `key`.
    pub fn set(&self, key: &str, data: impl Into<Bytes>) {
        self.blobs.write().insert(
            key.to_string(),
            BlobEntry {
                data: data.into(),
                stored_at: Instant::now(),
                updated: Timestamp::now(),
            },
        );
    }

    /// Returns a fresh document stored under `key`.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let blobs = self.blobs.read();
        let entry = blobs.get(key)?;
        if entry.stored_at.elapsed() <= self.config.blob_ttl() {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    /// Returns when `key` was last refreshed.
    pub fn last_update(&self, key: &str) -> Option<Timestamp> {
        let listing = self
            .listings
            .read()
            .get(key)
            .map(|p| p.snapshot.fetched_at());
        let blob = self.blobs.read().get(key).map(|b| b.updated);
        Timestamp::latest(listing, blob)
    }

    /// Drops the listing and document cached under `key`.
    pub fn invalidate(&self, key: &str) {
        self.listings.write().remove(key);
        self.blobs.write().remove(key);
        debug!(key = %key, "Invalidated cache entry");
    }

    /// Drops every listing and document whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.listings.write().retain(|k, _| !k.starts_with(prefix));
        self.blobs.write().retain(|k, _| !k.starts_with(prefix));
        debug!(prefix = %prefix, "Invalidated cache entries");
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    fn fresh(&self, key: &str) -> Option<Arc<ListingSnapshot>> {
        let listings = self.listings.read();
        let published = listings.get(key)?;
        if published.stored_at.elapsed() <= self.config.listing_ttl() {
            Some(published.snapshot.clone())
        } else {
            None
        }
    }

    fn published_generation(&self, key: &str) -> u64 {
        self.listings.read().get(key).map_or(0, |p| p.generation)
    }

    fn published_since(&self, key: &str, seen: u64) -> Option<Arc<ListingSnapshot>> {
        let listings = self.listings.read();
        let published = listings.get(key)?;
        (published.generation > seen).then(|| published.snapshot.clone())
    }

    fn gate(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.gates
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_snapshot_dedup() {
        let snapshot = ListingSnapshot::new(ids(&["b", "a", "b"]), Timestamp::new(1));
        assert_eq!(snapshot.identifiers(), &["b".to_string(), "a".to_string()]);
        assert!(snapshot.contains("a"));
        assert!(!snapshot.contains("A"));
    }

    #[tokio::test]
    async fn test_cache_hit_after_fetch() {
        let cache = ListingCache::with_defaults();

        let first = cache
            .cached_strings("docker/container", || async { Ok::<_, ()>(ids(&["abc"])) })
            .await
            .unwrap();
        let second = cache
            .cached_strings("docker/container", || async {
                Ok::<_, ()>(ids(&["should-not-run"]))
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_fetch_error_not_cached() {
        let cache = ListingCache::with_defaults();

        let err = cache
            .cached_strings("k", || async { Err::<Vec<String>, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.peek("k").is_none());

        let ok = cache
            .cached_strings("k", || async { Ok::<_, &str>(ids(&["x"])) })
            .await
            .unwrap();
        assert_eq!(ok.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_snapshot_refetched() {
        let cache = ListingCache::new(CacheConfig {
            listing_ttl_secs: 0,
            ..Default::default()
        });

        cache
            .cached_strings("k", || async { Ok::<_, ()>(ids(&["old"])) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let refreshed = cache
            .cached_strings("k", || async { Ok::<_, ()>(ids(&["new"])) })
            .await
            .unwrap();

        assert_eq!(refreshed.identifiers(), &["new".to_string()]);
        assert_eq!(cache.stats().fetches, 2);
    }

    #[tokio::test]
    async fn test_single_flight() {
        let cache = Arc::new(ListingCache::with_defaults());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .cached_strings("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, ()>(ids(&["a", "b"]))
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().len(), 2);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blob_and_last_update() {
        let cache = ListingCache::with_defaults();
        assert!(cache.last_update("docker/volume/data").is_none());

        cache.set("docker/volume/data", Bytes::from_static(b"{}"));
        assert_eq!(cache.get("docker/volume/data").unwrap(), Bytes::from_static(b"{}"));
        assert!(cache.last_update("docker/volume/data").is_some());

        cache.invalidate_prefix("docker/volume");
        assert!(cache.get("docker/volume/data").is_none());
    }
}
