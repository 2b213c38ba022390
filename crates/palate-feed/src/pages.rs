//! Page cache and prefetcher
//!
//! Two tiers sit in front of the remote store:
//! - fetched pages, keyed by [`PageKey`] and valid for the page TTL
//! - one-ahead prefetch slots, keyed by `(user, offset)`, consumed once
//!
//! A navigation checks the prefetch slot first, then the page cache, then
//! fetches. Loading never writes a cache itself; the controller commits a
//! page only after its staleness check passes.

use crate::error::FeedError;
use crate::query::{sort_client_side, Projection, QueryBuilder};
use crate::remote::{bounded, RemoteStore};
use palate_cache::{CacheStats, InFlightGuard, InFlightSet, PrefetchSlots, PrefetchStats, TtlCache};
use palate_model::{ActivityItem, Digest, FilterState, Roster, UserId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cache key for one page: owners, filter signature and offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    /// Roster fingerprint
    pub roster: Digest,
    /// Filter signature
    pub filter: Digest,
    /// Row offset
    pub offset: usize,
}

impl PageKey {
    /// Key for `filter` at `offset` over `roster`
    #[must_use]
    pub fn new(roster: &Roster, filter: &FilterState, offset: usize) -> Self {
        Self {
            roster: roster.fingerprint(),
            filter: filter.signature(),
            offset,
        }
    }

    /// Same owners and filter, different offset
    #[must_use]
    pub fn at(&self, offset: usize) -> Self {
        Self { offset, ..*self }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.roster.short(), self.filter.short(), self.offset)
    }
}

/// One fetched, enriched page
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    /// Items in display order
    pub items: Vec<ActivityItem>,
    /// Rows the store returned before validation; drives `has_more`
    pub raw_count: usize,
}

/// Where a page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOrigin {
    /// Consumed from the prefetch tier
    Prefetch,
    /// Served by the fetched-page tier
    PageCache,
    /// Fetched from the remote store
    Remote,
}

/// Counters across both tiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSourceStats {
    /// Fetched-page tier
    pub pages: CacheStats,
    /// Prefetch tier
    pub prefetch: PrefetchStats,
    /// Foreground fetches currently outstanding
    pub in_flight: usize,
}

/// Fetches pages through the cache tiers
pub struct PageSource {
    store: Arc<dyn RemoteStore>,
    builder: QueryBuilder,
    page_size: usize,
    timeout: Duration,
    pages: TtlCache<PageKey, Arc<FetchedPage>>,
    prefetch: PrefetchSlots<(UserId, usize), PageKey, Arc<FetchedPage>>,
    in_flight: InFlightSet<PageKey>,
    prefetch_in_flight: InFlightSet<PageKey>,
}

impl PageSource {
    /// Create a page source
    #[must_use]
    pub fn new(
        store: Arc<dyn RemoteStore>,
        projection: Projection,
        page_size: usize,
        page_ttl: Duration,
        capacity: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            builder: QueryBuilder::new(projection),
            page_size,
            timeout,
            pages: TtlCache::new("pages", capacity, page_ttl),
            prefetch: PrefetchSlots::new(),
            in_flight: InFlightSet::new(),
            prefetch_in_flight: InFlightSet::new(),
        }
    }

    /// Page size used for every window
    #[inline]
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Claim a foreground fetch; `None` if an identical one is outstanding
    #[must_use]
    pub fn begin(&self, key: PageKey) -> Option<InFlightGuard<PageKey>> {
        self.in_flight.try_begin(key)
    }

    /// Load a page: prefetch slot, then page cache, then remote
    ///
    /// # Errors
    /// `FeedError::UpstreamUnavailable` if the remote fetch fails or times out
    pub async fn load(
        &self,
        user: UserId,
        roster: &Roster,
        filter: &FilterState,
        key: PageKey,
    ) -> Result<(Arc<FetchedPage>, PageOrigin), FeedError> {
        if let Some(page) = self.prefetch.take(&(user, key.offset), &key) {
            tracing::debug!(%key, "page served from prefetch");
            return Ok((page, PageOrigin::Prefetch));
        }
        if let Some(page) = self.pages.get(&key).await {
            tracing::debug!(%key, "page served from cache");
            return Ok((page, PageOrigin::PageCache));
        }

        let page = self.fetch(roster, filter, key.offset).await?;
        tracing::debug!(%key, items = page.items.len(), "page fetched");
        Ok((Arc::new(page), PageOrigin::Remote))
    }

    /// Store an accepted page in the fetched-page tier
    pub async fn commit(&self, key: PageKey, page: Arc<FetchedPage>) {
        self.pages.insert(key, page).await;
    }

    /// Query the store and enrich rows with owner info
    async fn fetch(
        &self,
        roster: &Roster,
        filter: &FilterState,
        offset: usize,
    ) -> Result<FetchedPage, FeedError> {
        let plan = self
            .builder
            .build(&roster.owner_ids(), filter, offset, self.page_size);
        let rows = bounded("page", self.timeout, self.store.query(&plan.query)).await?;
        let raw_count = rows.len();

        let mut items = Vec::with_capacity(raw_count);
        for raw in rows {
            let Some(owner) = roster.get(&raw.owner_id) else {
                tracing::warn!(id = %raw.id, "dropping record owned outside the roster");
                continue;
            };
            match ActivityItem::from_raw(raw, owner) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(error = %e, "dropping invalid record"),
            }
        }
        if let Some(key) = plan.client_sort {
            sort_client_side(&mut items, key);
        }

        Ok(FetchedPage { items, raw_count })
    }

    /// Warm the page after `current` in the background
    ///
    /// Skipped when that page is already cached, already prefetched, or
    /// already being prefetched. Failures are logged and swallowed; the next
    /// navigation simply fetches synchronously.
    pub fn spawn_prefetch(
        self: &Arc<Self>,
        user: UserId,
        roster: Arc<Roster>,
        filter: FilterState,
        current: PageKey,
    ) -> Option<JoinHandle<()>> {
        let key = current.at(current.offset.saturating_add(self.page_size));
        let slot = (user, key.offset);
        if self.prefetch.contains(&slot) {
            return None;
        }
        let generation = self.prefetch.generation();
        let this = Arc::clone(self);

        Some(tokio::spawn(async move {
            if this.pages.contains(&key).await {
                return;
            }
            let Some(_guard) = this.prefetch_in_flight.try_begin(key) else {
                return;
            };
            match this.fetch(&roster, &filter, key.offset).await {
                Ok(page) => {
                    if this.prefetch.put(slot, generation, key, Arc::new(page)) {
                        tracing::debug!(%key, "prefetched next page");
                    }
                }
                Err(e) => tracing::warn!(%key, error = %e, "prefetch failed"),
            }
        }))
    }

    /// Prefetch generation; capture it before a load that may consume a slot
    #[must_use]
    pub fn prefetch_generation(&self) -> u64 {
        self.prefetch.generation()
    }

    /// Put a consumed prefetch back after its response went stale
    ///
    /// Refused if the prefetch tier was invalidated since `generation`,
    /// since the page was then computed for filters that no longer apply.
    pub fn restore_prefetch(
        &self,
        user: UserId,
        key: PageKey,
        generation: u64,
        page: Arc<FetchedPage>,
    ) -> bool {
        self.prefetch.put((user, key.offset), generation, key, page)
    }

    /// Whether a prefetched page is waiting at `offset`
    #[must_use]
    pub fn has_prefetched(&self, user: UserId, offset: usize) -> bool {
        self.prefetch.contains(&(user, offset))
    }

    /// Drop prefetch slots (and fence off running prefetches)
    pub fn invalidate_prefetch(&self) {
        self.prefetch.invalidate_all();
    }

    /// Drop both tiers
    pub fn invalidate_all(&self) {
        self.pages.invalidate_all();
        self.prefetch.invalidate_all();
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> PageSourceStats {
        PageSourceStats {
            pages: self.pages.stats(),
            prefetch: self.prefetch.stats(),
            in_flight: self.in_flight.len(),
        }
    }
}

impl fmt::Debug for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSource")
            .field("page_size", &self.page_size)
            .field("timeout", &self.timeout)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
