//! Corpus-wide counts
//!
//! One bulk projection read across every owner in the roster, cached by the
//! roster fingerprint. Counting never pulls full records and does not depend
//! on the current filters or page window.

use crate::error::FeedError;
use crate::query::CountProjection;
use crate::remote::{bounded, RemoteStore};
use palate_cache::{CacheStats, TtlCache};
use palate_model::{Digest, MetadataSnapshot, Roster};
use std::sync::Arc;
use std::time::Duration;

/// Computes [`MetadataSnapshot`]s for a roster
pub struct MetadataAggregator {
    store: Arc<dyn RemoteStore>,
    cache: TtlCache<Digest, Arc<MetadataSnapshot>>,
    projection: CountProjection,
    timeout: Duration,
}

impl MetadataAggregator {
    /// Create an aggregator
    #[must_use]
    pub fn new(store: Arc<dyn RemoteStore>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            store,
            cache: TtlCache::new("metadata", 256, ttl),
            projection: CountProjection::default(),
            timeout,
        }
    }

    /// Counts for `roster`
    ///
    /// # Errors
    /// `FeedError::PartialMetadataFailure` if the bulk read fails or times out
    pub async fn try_compute(&self, roster: &Roster) -> Result<Arc<MetadataSnapshot>, FeedError> {
        if roster.is_empty() {
            return Ok(Arc::new(MetadataSnapshot::default()));
        }

        let fingerprint = roster.fingerprint();
        if let Some(snapshot) = self.cache.get(&fingerprint).await {
            return Ok(snapshot);
        }

        let owners = roster.owner_ids();
        let rows = bounded(
            "metadata",
            self.timeout,
            self.store.bulk_count(&owners, &self.projection),
        )
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "metadata aggregation failed; counts fall back to loaded pages");
            FeedError::PartialMetadataFailure(e.to_string())
        })?;

        let snapshot = Arc::new(MetadataSnapshot::from_rows(
            rows.iter().filter(|row| roster.get(&row.owner_id).is_some()),
        ));
        tracing::info!(
            fingerprint = %fingerprint.short(),
            total = snapshot.total_count,
            rated = snapshot.rated_count,
            wishlist = snapshot.wishlist_count,
            "metadata computed"
        );

        self.cache.insert(fingerprint, Arc::clone(&snapshot)).await;
        Ok(snapshot)
    }

    /// Forget every snapshot
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Cache counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl std::fmt::Debug for MetadataAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataAggregator")
            .field("projection", &self.projection)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
