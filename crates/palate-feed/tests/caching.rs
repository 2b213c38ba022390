//! Cache tiers, prefetch, and request concurrency.
//!
//! Core guarantees exercised here:
//! - A prefetched page is served once, then forgotten.
//! - Fetched pages expire after the page TTL; rosters after the roster TTL.
//! - A duplicate request for a key already in flight is suppressed.
//! - A response that no longer matches the view is discarded and never
//!   written to a cache.
//!   A prefetched page taken by such a request goes back to its slot.
//! - Signing out drops every tier.

use palate_feed::{FeedConfig, FeedPhase, LoadOutcome, PageOrigin};
use palate_model::FilterPatch;
use palate_test_utils::{two_friends, uniform, Fixture};
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Guarantee: a consumed prefetch is absent on the next identical navigation,
/// which therefore fetches again.
#[tokio::test]
async fn prefetch_is_single_use() {
    let fx = Fixture::new(uniform(60));
    fx.feed.mount().await.unwrap();
    assert!(fx.feed.wait_for_prefetch().await);
    assert!(fx.feed.has_prefetched(18));
    assert_eq!(fx.store.queries_at(18), 1);

    let outcome = fx.feed.next_page().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded(PageOrigin::Prefetch));
    assert_eq!(fx.store.queries_at(18), 1, "served without a network call");
    assert!(!fx.feed.has_prefetched(18));

    fx.feed.previous_page().await.unwrap();
    let outcome = fx.feed.next_page().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded(PageOrigin::Remote));
    assert_eq!(fx.store.queries_at(18), 2);

    let stats = fx.feed.stats().pages.prefetch;
    assert_eq!(stats.consumed, 1);
}

#[tokio::test]
async fn prefetch_uses_the_same_predicates() {
    let fx = Fixture::new(uniform(60));
    fx.feed.mount().await.unwrap();
    fx.feed.set_filter(FilterPatch::new().search("rated")).await.unwrap();
    fx.feed.wait_for_prefetch().await;

    let log = fx.store.query_log();
    let current = log.iter().rev().find(|q| q.offset == 0).unwrap();
    assert!(log.iter().any(|q| q.offset == 18
        && q.predicates == current.predicates
        && q.sort == current.sort
        && q.limit == current.limit));
}

#[tokio::test]
async fn filter_change_discards_prefetch() {
    let fx = Fixture::new(uniform(60));
    fx.feed.mount().await.unwrap();
    fx.feed.wait_for_prefetch().await;
    assert!(fx.feed.has_prefetched(18));

    fx.feed.set_filter(FilterPatch::new().cities(["Porto"])).await.unwrap();
    assert!(!fx.feed.has_prefetched(18));
}

#[tokio::test]
async fn last_page_schedules_no_prefetch() {
    let fx = Fixture::new(uniform(10));
    fx.feed.mount().await.unwrap();
    assert!(!fx.feed.wait_for_prefetch().await);
    assert_eq!(fx.store.query_count(), 1);
}

/// Guarantee: a cached page is served until the page TTL elapses, then refetched.
#[tokio::test(start_paused = true)]
async fn page_cache_expires() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();
    fx.feed.wait_for_prefetch().await;
    fx.feed.next_page().await.unwrap();

    let outcome = fx.feed.previous_page().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded(PageOrigin::PageCache));
    assert_eq!(fx.store.queries_at(0), 1);

    fx.feed.next_page().await.unwrap();
    tokio::time::advance(Duration::from_secs(300)).await;

    let outcome = fx.feed.previous_page().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded(PageOrigin::Remote));
    assert_eq!(fx.store.queries_at(0), 2);
    assert_eq!(fx.graph.call_count(), 1, "the roster outlives the page TTL");
}

#[tokio::test(start_paused = true)]
async fn roster_expires_after_its_ttl() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();
    fx.feed.go_to_page(1).await.unwrap();
    assert_eq!(fx.graph.call_count(), 1);

    tokio::time::advance(Duration::from_secs(30 * 60)).await;
    fx.feed.go_to_page(1).await.unwrap();
    assert_eq!(fx.graph.call_count(), 2);
}

/// Guarantee: a second identical request while one is in flight is
/// suppressed, not queued or duplicated.
#[tokio::test(start_paused = true)]
async fn duplicate_request_is_suppressed() {
    let fx = Fixture::new(uniform(40));
    fx.store.set_latency(Duration::from_millis(200));

    let (a, b) = tokio::join!(fx.feed.mount(), fx.feed.mount());
    let mut outcomes = [a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, LoadOutcome::Suppressed));

    assert_eq!(
        outcomes,
        [LoadOutcome::Loaded(PageOrigin::Remote), LoadOutcome::Suppressed]
    );
    assert_eq!(fx.store.queries_at(0), 1);
    assert_eq!(fx.feed.phase(), FeedPhase::Idle);
    assert_eq!(fx.feed.visible_page().items.len(), 18);
}

/// Guarantee: a response that arrives after the filters moved on is dropped
/// and does not populate the page cache.
#[tokio::test(start_paused = true)]
async fn stale_response_is_discarded() {
    let fx = Fixture::new(two_friends());
    fx.feed.mount().await.unwrap();
    fx.store.set_latency(Duration::from_millis(200));

    let (first, second) = tokio::join!(
        fx.feed.set_filter(FilterPatch::new().search("ana")),
        fx.feed.set_filter(FilterPatch::new().search("bo")),
    );
    assert_eq!(first.unwrap(), LoadOutcome::Discarded);
    assert_eq!(second.unwrap(), LoadOutcome::Loaded(PageOrigin::Remote));
    assert_eq!(fx.feed.filter().search_text, "bo");
    assert!(!fx.feed.visible_page().items.is_empty());

    let outcome = fx.feed.set_filter(FilterPatch::new().search("ana")).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded(PageOrigin::Remote));
}

/// Guarantee: a prefetched page consumed by a request that then went stale
/// is still available to the next navigation.
#[tokio::test(start_paused = true)]
async fn stale_load_returns_prefetched_page_to_its_slot() {
    let fx = Fixture::new(uniform(60));
    fx.store.fail_counts.store(true, Ordering::SeqCst);
    fx.feed.mount().await.unwrap();
    assert!(fx.feed.wait_for_prefetch().await);
    assert!(fx.feed.has_prefetched(18));

    // Page 2 fails on the roster, leaving a retry that will consume slot 18.
    tokio::time::advance(Duration::from_secs(31 * 60)).await;
    fx.graph.fail.store(true, Ordering::SeqCst);
    assert!(fx.feed.next_page().await.is_err());
    fx.graph.fail.store(false, Ordering::SeqCst);
    assert!(fx.feed.has_prefetched(18));

    // The retry also recomputes the missing counts, which is slow, so a jump
    // back to page 1 overtakes it.
    fx.store.set_latency(Duration::from_millis(200));
    let (retried, jumped) = tokio::join!(fx.feed.retry(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        fx.feed.go_to_page(1).await
    });
    assert_eq!(retried.unwrap(), LoadOutcome::Discarded);
    assert_eq!(jumped.unwrap(), LoadOutcome::Loaded(PageOrigin::Remote));
    assert!(fx.feed.has_prefetched(18));

    assert_eq!(
        fx.feed.next_page().await.unwrap(),
        LoadOutcome::Loaded(PageOrigin::Prefetch)
    );
    assert_eq!(fx.store.queries_at(18), 1);
    assert_eq!(fx.feed.visible_page().page_number, 2);
}

#[tokio::test]
async fn sign_out_drops_every_tier() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();
    fx.feed.set_filter(FilterPatch::new().search("rated")).await.unwrap();

    fx.feed.sign_out();
    fx.auth.sign_out();
    let page = fx.feed.visible_page();
    assert!(page.items.is_empty());
    assert_eq!(fx.feed.filter().search_text, "");
    assert!(!fx.feed.has_prefetched(18));

    fx.auth.sign_in(fx.scenario.user);
    assert_eq!(
        fx.feed.mount().await.unwrap(),
        LoadOutcome::Loaded(PageOrigin::Remote)
    );
    assert_eq!(fx.graph.call_count(), 2);
    assert_eq!(fx.store.count_count(), 2);
}

#[tokio::test]
async fn photo_projection_is_configurable() {
    let with = Fixture::new(uniform(5));
    with.feed.mount().await.unwrap();
    assert!(with.feed.visible_page().items.iter().all(|i| !i.photo_refs.is_empty()));

    let without = Fixture::with_config(uniform(5), FeedConfig::new().with_photos(false));
    without.feed.mount().await.unwrap();
    assert!(without.feed.visible_page().items.iter().all(|i| i.photo_refs.is_empty()));
}
