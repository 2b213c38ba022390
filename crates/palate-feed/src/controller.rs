//! Pagination and filter controller
//!
//! The controller owns the feed's mutable state and is the only thing that
//! changes it. Every event (mount, filter change, navigation, retry) runs
//! through one private `load` routine:
//!
//! ```text
//!            mount / filter change            next / previous
//!   Idle ───────────────────────► LoadingInitial    Idle ──► LoadingPage
//!    ▲                                │                        │
//!    └──────────── success ───────────┴────────────────────────┘
//!                                     │ failure
//!                                     ▼
//!                                   Error ──retry──► Loading*
//! ```
//!
//! Requests are tagged with what the view wants (filter signature plus
//! offset) when they start. A response that arrives after the view moved on
//! is discarded without touching state or caches.

use crate::config::FeedConfig;
use crate::debounce::Debouncer;
use crate::error::FeedError;
use crate::metadata::MetadataAggregator;
use crate::pages::{FetchedPage, PageKey, PageOrigin, PageSource, PageSourceStats};
use crate::query::Projection;
use crate::remote::{AuthContext, RemoteStore, SocialGraph};
use crate::roster::RosterResolver;
use palate_cache::CacheStats;
use palate_model::{
    ActivityItem, Digest, FeedLocation, FilterPatch, FilterState, MetadataSnapshot,
    PaginationState, Roster, UserId,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Controller state machine phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedPhase {
    /// Nothing outstanding
    #[default]
    Idle,
    /// Loading page 1 for a new view
    LoadingInitial,
    /// Navigating between pages of the same view
    LoadingPage,
    /// Last load failed; `retry` recovers
    Error,
}

/// What an event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page is now displayed
    Loaded(PageOrigin),
    /// Nobody is signed in; the feed is empty and terminal
    SignedOut,
    /// The user has no friends; the feed is empty and terminal
    EmptyRoster,
    /// An identical request was already in flight
    Suppressed,
    /// The response no longer matched the view and was dropped
    Discarded,
    /// No page in that direction
    Boundary,
    /// Nothing to do: the filter patch changed nothing, or nothing failed
    Unchanged,
    /// The requested page was empty; the current page stays displayed
    Exhausted,
}

/// Snapshot handed to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct VisiblePage {
    /// Items on the current page, in display order
    pub items: Vec<ActivityItem>,
    /// 1-based page number
    pub page_number: usize,
    /// Whether a next page may exist
    pub has_more: bool,
    /// Corpus-wide counts for the filter options
    pub filter_counts: MetadataSnapshot,
    /// Counts were derived from loaded items only
    pub counts_are_approximate: bool,
    /// Current phase
    pub phase: FeedPhase,
    /// Error to show, if the last load failed
    pub error: Option<FeedError>,
}

/// Cache counters for every tier the controller owns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Roster cache
    pub roster: CacheStats,
    /// Metadata cache
    pub metadata: CacheStats,
    /// Page and prefetch tiers
    pub pages: PageSourceStats,
}

/// The request the view currently wants answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Want {
    filter: Digest,
    offset: usize,
}

#[derive(Debug)]
struct State {
    phase: FeedPhase,
    filter: FilterState,
    draft: String,
    pagination: PaginationState,
    items: Vec<ActivityItem>,
    counts: Option<Arc<MetadataSnapshot>>,
    metadata_roster: Option<Digest>,
    metadata_failed: bool,
    error: Option<FeedError>,
    wanted: Option<Want>,
    failed_offset: usize,
    prefetch: Option<JoinHandle<()>>,
}

impl State {
    fn new(page_size: usize) -> Self {
        Self {
            phase: FeedPhase::Idle,
            filter: FilterState::default(),
            draft: String::new(),
            pagination: PaginationState::new(page_size),
            items: Vec::new(),
            counts: None,
            metadata_roster: None,
            metadata_failed: false,
            error: None,
            wanted: None,
            failed_offset: 0,
            prefetch: None,
        }
    }

    /// Empty, terminal page
    fn show_nothing(&mut self) {
        self.items.clear();
        self.pagination.reset();
        self.phase = FeedPhase::Idle;
        self.error = None;
    }
}

/// Drives the feed: one instance per signed-in session
pub struct FeedController {
    config: FeedConfig,
    auth: Arc<dyn AuthContext>,
    roster: RosterResolver,
    metadata: MetadataAggregator,
    pages: Arc<PageSource>,
    debouncer: Debouncer,
    state: Mutex<State>,
}

impl FeedController {
    /// Build a controller over the given collaborators
    ///
    /// # Errors
    /// `FeedError::Config` if `config` fails validation
    pub fn new(
        config: FeedConfig,
        auth: Arc<dyn AuthContext>,
        graph: Arc<dyn SocialGraph>,
        store: Arc<dyn RemoteStore>,
    ) -> Result<Arc<Self>, FeedError> {
        config.validate()?;
        let timeout = config.remote_timeout();
        let projection = Projection {
            include_photos: config.include_photos,
        };

        Ok(Arc::new(Self {
            roster: RosterResolver::new(graph, config.roster_ttl(), timeout),
            metadata: MetadataAggregator::new(Arc::clone(&store), config.metadata_ttl(), timeout),
            pages: Arc::new(PageSource::new(
                store,
                projection,
                config.page_size,
                config.page_ttl(),
                config.page_cache_capacity,
                timeout,
            )),
            debouncer: Debouncer::new(config.search_debounce()),
            state: Mutex::new(State::new(config.page_size)),
            auth,
            config,
        }))
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Load page 1 for the current filters
    ///
    /// # Errors
    /// `FeedError::UpstreamUnavailable` if the roster or the page cannot be fetched
    pub async fn mount(&self) -> Result<LoadOutcome, FeedError> {
        tracing::info!("feed mounted");
        self.load(0, FeedPhase::LoadingInitial, false).await
    }

    /// Re-run the request that failed
    ///
    /// Out of `Error` this repeats the failed load; the roster is
    /// re-validated against its TTL first. With only the counts missing it
    /// reloads the current page and recomputes them. Otherwise there is
    /// nothing to retry and `Unchanged` is returned.
    ///
    /// # Errors
    /// `FeedError::UpstreamUnavailable` if it fails again
    pub async fn retry(&self) -> Result<LoadOutcome, FeedError> {
        let (offset, force_metadata) = {
            let state = self.state.lock();
            match state.phase {
                FeedPhase::Error => (state.failed_offset, state.metadata_failed),
                FeedPhase::Idle if state.metadata_failed => (state.pagination.offset(), true),
                _ => return Ok(LoadOutcome::Unchanged),
            }
        };
        let phase = if offset == 0 {
            FeedPhase::LoadingInitial
        } else {
            FeedPhase::LoadingPage
        };
        tracing::info!(offset, "retrying feed load");
        self.load(offset, phase, force_metadata).await
    }

    /// Apply a filter change and reload from page 1
    ///
    /// A status change drops every cached page; other changes keep cached
    /// pages (their keys no longer match) and drop only prefetched ones.
    /// Corpus-wide counts are never recomputed for a filter change.
    ///
    /// # Errors
    /// `FeedError::UpstreamUnavailable` if page 1 cannot be fetched
    pub async fn set_filter(&self, patch: FilterPatch) -> Result<LoadOutcome, FeedError> {
        {
            let mut state = self.state.lock();
            let change = state.filter.apply(patch);
            if change.is_empty() {
                return Ok(LoadOutcome::Unchanged);
            }
            if change.search {
                state.draft = state.filter.search_text.clone();
            }
            if change.requires_cache_reset() {
                self.pages.invalidate_all();
            } else {
                self.pages.invalidate_prefetch();
            }
            state.pagination.reset();
            tracing::info!(
                signature = %state.filter.signature().short(),
                status = %state.filter.status,
                sort = %state.filter.sort_key,
                full_reset = change.requires_cache_reset(),
                "filters changed"
            );
        }
        self.load(0, FeedPhase::LoadingInitial, false).await
    }

    /// Record a keystroke; the query follows after the quiet period
    pub fn type_search(self: &Arc<Self>, text: impl Into<String>) {
        self.state.lock().draft = text.into();
        let weak = Arc::downgrade(self);
        self.debouncer.schedule(async move {
            let Some(this) = weak.upgrade() else {
                return;
            };
            let draft = this.search_draft();
            if let Err(e) = this.set_filter(FilterPatch::new().search(draft)).await {
                tracing::debug!(error = %e, "debounced search failed");
            }
        });
    }

    /// Apply the draft search text immediately
    ///
    /// # Errors
    /// `FeedError::UpstreamUnavailable` if page 1 cannot be fetched
    pub async fn submit_search(&self) -> Result<LoadOutcome, FeedError> {
        self.debouncer.cancel();
        let draft = self.search_draft();
        self.set_filter(FilterPatch::new().search(draft)).await
    }

    /// Search text as typed, possibly not yet applied
    #[must_use]
    pub fn search_draft(&self) -> String {
        self.state.lock().draft.clone()
    }

    /// Advance one page
    ///
    /// # Errors
    /// `FeedError::UpstreamUnavailable` if the page cannot be fetched
    pub async fn next_page(&self) -> Result<LoadOutcome, FeedError> {
        let offset = {
            let state = self.state.lock();
            if !state.pagination.has_more() {
                return Ok(LoadOutcome::Boundary);
            }
            state.pagination.offset().saturating_add(state.pagination.page_size())
        };
        self.load(offset, FeedPhase::LoadingPage, false).await
    }

    /// Go back one page
    ///
    /// # Errors
    /// `FeedError::UpstreamUnavailable` if the page cannot be fetched
    pub async fn previous_page(&self) -> Result<LoadOutcome, FeedError> {
        let offset = {
            let state = self.state.lock();
            if !state.pagination.has_previous() {
                return Ok(LoadOutcome::Boundary);
            }
            state.pagination.offset() - state.pagination.page_size()
        };
        self.load(offset, FeedPhase::LoadingPage, false).await
    }

    /// Jump to a 1-based page
    ///
    /// # Errors
    /// `FeedError::UpstreamUnavailable` if the page cannot be fetched
    pub async fn go_to_page(&self, page_number: usize) -> Result<LoadOutcome, FeedError> {
        let page_number = page_number.max(1);
        let offset = self.state.lock().pagination.offset_of(page_number);
        let phase = if page_number == 1 {
            FeedPhase::LoadingInitial
        } else {
            FeedPhase::LoadingPage
        };
        self.load(offset, phase, false).await
    }

    /// Restore a deep-linked view
    ///
    /// Falls back to page 1 if the linked page turns out to be empty.
    ///
    /// # Errors
    /// `FeedError::UpstreamUnavailable` if the page cannot be fetched
    pub async fn open_location(&self, location: FeedLocation) -> Result<LoadOutcome, FeedError> {
        let offset = {
            let mut state = self.state.lock();
            let change = state.filter.apply(FilterPatch::replace_all(location.filter));
            state.draft = state.filter.search_text.clone();
            if change.requires_cache_reset() {
                self.pages.invalidate_all();
            } else if !change.is_empty() {
                self.pages.invalidate_prefetch();
            }
            state.pagination.reset();
            state.pagination.offset_of(location.page)
        };
        tracing::info!(page = location.page, "opening feed location");

        let phase = if offset == 0 {
            FeedPhase::LoadingInitial
        } else {
            FeedPhase::LoadingPage
        };
        match self.load(offset, phase, false).await? {
            LoadOutcome::Exhausted => self.load(0, FeedPhase::LoadingInitial, false).await,
            outcome => Ok(outcome),
        }
    }

    /// Current filters and page as a deep link
    #[must_use]
    pub fn location(&self) -> FeedLocation {
        let state = self.state.lock();
        FeedLocation::new(state.filter.clone(), state.pagination.page_number())
    }

    /// What the presentation layer should render
    ///
    /// When corpus-wide counts are unavailable they are derived from the
    /// items on screen and flagged approximate.
    #[must_use]
    pub fn visible_page(&self) -> VisiblePage {
        let state = self.state.lock();
        let (filter_counts, counts_are_approximate) = match &state.counts {
            Some(counts) => (MetadataSnapshot::clone(counts), false),
            None => (MetadataSnapshot::from_items(&state.items), true),
        };
        VisiblePage {
            items: state.items.clone(),
            page_number: state.pagination.page_number(),
            has_more: state.pagination.has_more(),
            filter_counts,
            counts_are_approximate,
            phase: state.phase,
            error: state.error.clone(),
        }
    }

    /// Applied filters
    #[must_use]
    pub fn filter(&self) -> FilterState {
        self.state.lock().filter.clone()
    }

    /// Pagination bookkeeping
    #[must_use]
    pub fn pagination(&self) -> PaginationState {
        self.state.lock().pagination
    }

    /// State machine phase
    #[must_use]
    pub fn phase(&self) -> FeedPhase {
        self.state.lock().phase
    }

    /// Tear down every cache tier and forget all state
    pub fn sign_out(&self) {
        self.debouncer.cancel();
        self.pages.invalidate_all();
        self.roster.clear();
        self.metadata.clear();

        let mut state = self.state.lock();
        if let Some(task) = state.prefetch.take() {
            task.abort();
        }
        *state = State::new(self.config.page_size);
        tracing::info!("feed signed out; caches dropped");
    }

    /// Wait for the most recent background prefetch, if any
    ///
    /// Navigation never waits for a prefetch; this exists for callers that
    /// want deterministic behavior (tests, scripted sessions).
    pub async fn wait_for_prefetch(&self) -> bool {
        let task = self.state.lock().prefetch.take();
        match task {
            Some(task) => task.await.is_ok(),
            None => false,
        }
    }

    /// Whether the page at `offset` is waiting in the prefetch tier
    #[must_use]
    pub fn has_prefetched(&self, offset: usize) -> bool {
        self.auth
            .current_user_id()
            .is_some_and(|user| self.pages.has_prefetched(user, offset))
    }

    /// Cache counters
    #[must_use]
    pub fn stats(&self) -> FeedStats {
        FeedStats {
            roster: self.roster.stats(),
            metadata: self.metadata.stats(),
            pages: self.pages.stats(),
        }
    }

    /// Fetch the page at `offset` for the current filters and display it
    async fn load(
        &self,
        offset: usize,
        phase: FeedPhase,
        force_metadata: bool,
    ) -> Result<LoadOutcome, FeedError> {
        let Some(user) = self.auth.current_user_id() else {
            let mut state = self.state.lock();
            state.show_nothing();
            state.counts = Some(Arc::new(MetadataSnapshot::default()));
            state.wanted = None;
            tracing::debug!("no signed-in user; feed is empty");
            return Ok(LoadOutcome::SignedOut);
        };

        let (filter, want) = {
            let mut state = self.state.lock();
            let want = Want {
                filter: state.filter.signature(),
                offset,
            };
            state.wanted = Some(want);
            state.phase = phase;
            state.error = None;
            (state.filter.clone(), want)
        };

        let roster = match self.roster.resolve(user).await {
            Ok(roster) => roster,
            Err(e) => return self.fail(want, e, true),
        };

        if roster.is_empty() {
            let mut state = self.state.lock();
            if state.wanted != Some(want) {
                return Ok(LoadOutcome::Discarded);
            }
            state.show_nothing();
            state.counts = Some(Arc::new(MetadataSnapshot::default()));
            state.metadata_roster = Some(roster.fingerprint());
            state.metadata_failed = false;
            tracing::info!(%user, "roster is empty");
            return Ok(LoadOutcome::EmptyRoster);
        }

        let key = PageKey::new(&roster, &filter, offset);
        let Some(guard) = self.pages.begin(key) else {
            return Ok(LoadOutcome::Suppressed);
        };

        let refresh_metadata = force_metadata || {
            let state = self.state.lock();
            state.metadata_roster != Some(roster.fingerprint())
        };
        let generation = self.pages.prefetch_generation();
        let (page, counts) = tokio::join!(
            self.pages.load(user, &roster, &filter, key),
            async {
                if refresh_metadata {
                    Some(self.metadata.try_compute(&roster).await)
                } else {
                    None
                }
            }
        );
        drop(guard);

        let (page, origin) = match page {
            Ok(loaded) => loaded,
            Err(e) => {
                self.apply_counts(want, &roster, counts);
                return self.fail(want, e, offset == 0);
            }
        };

        if self.state.lock().wanted != Some(want) {
            return Ok(self.discard(user, key, generation, page, origin));
        }
        self.apply_counts(want, &roster, counts);

        if page.raw_count == 0 && offset > 0 {
            let mut state = self.state.lock();
            if state.wanted != Some(want) {
                return Ok(self.discard(user, key, generation, page, origin));
            }
            state.pagination.mark_exhausted();
            state.phase = FeedPhase::Idle;
            tracing::debug!(%key, "requested page is empty; staying put");
            return Ok(LoadOutcome::Exhausted);
        }

        let has_more = {
            let mut state = self.state.lock();
            if state.wanted != Some(want) {
                return Ok(self.discard(user, key, generation, page, origin));
            }
            state.items = page.items.clone();
            state.pagination.record_fetch(offset, page.raw_count);
            state.phase = FeedPhase::Idle;
            state.error = None;
            tracing::info!(
                page = state.pagination.page_number(),
                items = state.items.len(),
                has_more = state.pagination.has_more(),
                ?origin,
                "page displayed"
            );
            state.pagination.has_more()
        };

        if origin == PageOrigin::Remote {
            self.pages.commit(key, Arc::clone(&page)).await;
        }
        // Pages served from cache were prefetched past when first fetched.
        if has_more && origin != PageOrigin::PageCache {
            if let Some(task) = self.pages.spawn_prefetch(user, roster, filter, key) {
                self.state.lock().prefetch = Some(task);
            }
        }

        Ok(LoadOutcome::Loaded(origin))
    }

    /// Drop a response the view no longer wants
    ///
    /// A page taken from the prefetch tier goes back to its slot so the
    /// speculative fetch is not lost.
    fn discard(
        &self,
        user: UserId,
        key: PageKey,
        generation: u64,
        page: Arc<FetchedPage>,
        origin: PageOrigin,
    ) -> LoadOutcome {
        if origin == PageOrigin::Prefetch && self.pages.restore_prefetch(user, key, generation, page) {
            tracing::debug!(%key, "stale prefetch returned to its slot");
        }
        let stale = FeedError::StaleResponse(key.to_string());
        tracing::debug!(error = %stale, "response discarded");
        LoadOutcome::Discarded
    }

    /// Store freshly computed counts, or mark them unavailable
    fn apply_counts(
        &self,
        want: Want,
        roster: &Roster,
        counts: Option<Result<Arc<MetadataSnapshot>, FeedError>>,
    ) {
        let Some(counts) = counts else {
            return;
        };
        let mut state = self.state.lock();
        if state.wanted != Some(want) {
            return;
        }
        state.metadata_roster = Some(roster.fingerprint());
        match counts {
            Ok(snapshot) => {
                state.counts = Some(snapshot);
                state.metadata_failed = false;
            }
            Err(_) => {
                state.counts = None;
                state.metadata_failed = true;
            }
        }
    }

    /// Enter the error state unless the request went stale
    fn fail(&self, want: Want, error: FeedError, clear_items: bool) -> Result<LoadOutcome, FeedError> {
        let mut state = self.state.lock();
        if state.wanted != Some(want) {
            tracing::debug!(error = %error, "failure for a stale request ignored");
            return Ok(LoadOutcome::Discarded);
        }
        if clear_items {
            state.items.clear();
        }
        state.pagination.mark_exhausted();
        state.phase = FeedPhase::Error;
        state.failed_offset = want.offset;
        state.error = Some(error.clone());
        tracing::warn!(error = %error, offset = want.offset, "feed load failed");
        Err(error)
    }
}

impl std::fmt::Debug for FeedController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedController")
            .field("config", &self.config)
            .field("roster", &self.roster)
            .field("metadata", &self.metadata)
            .field("pages", &self.pages)
            .finish_non_exhaustive()
    }
}
