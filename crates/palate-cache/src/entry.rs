//! Timestamped cache entries

use std::time::Duration;
use tokio::time::Instant;

/// A cached value and the moment it was fetched
///
/// Valid iff `now - fetched_at < ttl`. The timestamp comes from the tokio
/// clock so paused-time tests can age entries deterministically.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Cached value
    pub value: T,
    /// When the value was fetched
    pub fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Stamp a value with the current time
    #[inline]
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    /// Time since fetch
    #[inline]
    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// Whether the entry is still usable under `ttl`
    #[inline]
    #[must_use]
    pub fn is_valid(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entry_expires_exactly_at_ttl() {
        let entry = CacheEntry::new(7);
        let ttl = Duration::from_secs(60);
        assert!(entry.is_valid(ttl));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(entry.is_valid(ttl));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!entry.is_valid(ttl));
    }
}
