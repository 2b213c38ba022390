//! TTL cache tier using moka
//!
//! moka bounds memory (capacity + its own expiry); validity is decided by
//! [`CacheEntry::is_valid`] against the tier's TTL, so an expired entry is a
//! forced miss on the very next read.

use crate::entry::CacheEntry;
use moka::future::Cache;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Hit/miss counters for one tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from the tier
    pub hits: u64,
    /// Reads that found nothing usable
    pub misses: u64,
    /// Approximate number of stored entries
    pub entry_count: u64,
}

/// Concurrent cache whose entries expire after a fixed TTL
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    name: &'static str,
    ttl: Duration,
    inner: Cache<K, CacheEntry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a tier with a name (for logs), capacity and TTL
    #[must_use]
    pub fn new(name: &'static str, max_capacity: u64, ttl: Duration) -> Self {
        let mut builder = Cache::builder().max_capacity(max_capacity);
        if !ttl.is_zero() {
            builder = builder.time_to_live(ttl);
        }
        Self {
            name,
            ttl,
            inner: builder.build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Tier TTL
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read a valid entry; expired entries are evicted and count as misses
    pub async fn get(&self, key: &K) -> Option<V> {
        match self.inner.get(key).await {
            Some(entry) if entry.is_valid(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(cache = self.name, "hit");
                Some(entry.value)
            }
            Some(entry) => {
                self.inner.invalidate(key).await;
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache = self.name, age_ms = entry.age().as_millis() as u64, "expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(cache = self.name, "miss");
                None
            }
        }
    }

    /// Whether a valid entry exists, without touching the counters
    pub async fn contains(&self, key: &K) -> bool {
        self.inner
            .get(key)
            .await
            .is_some_and(|entry| entry.is_valid(self.ttl))
    }

    /// Store a freshly fetched value
    pub async fn insert(&self, key: K, value: V) {
        self.inner.insert(key, CacheEntry::new(value)).await;
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
        tracing::debug!(cache = self.name, "invalidated all entries");
    }

    /// Flush moka's pending maintenance so `entry_count` is exact
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.inner.entry_count(),
        }
    }
}
