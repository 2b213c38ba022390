//! Filter changes, search debounce and corpus-wide counts.
//!
//! Core guarantees exercised here:
//! - Any filter change returns to page 1 under a different cache key.
//! - A status change drops cached pages; other changes keep them.
//! - Counts are corpus-wide and are not recomputed for a filter change,
//!   only when the roster itself changes.
//! - Typed search only queries after a quiet period; submit bypasses it.

use palate_feed::{LoadOutcome, PageKey, PageOrigin};
use palate_model::{FilterPatch, FilterState, Roster, SortKey, StatusFilter};
use palate_test_utils::{two_friends, uniform, Fixture};
use pretty_assertions::assert_eq;
use std::time::Duration;

/// Guarantee: every filter transition resets to page 1 and never serves a
/// page cached under the old signature.
#[tokio::test]
async fn filter_change_resets_pagination() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();
    fx.feed.next_page().await.unwrap();
    assert_eq!(fx.feed.pagination().page_number(), 2);

    let patches = [
        FilterPatch::new().search("lisbon"),
        FilterPatch::new().categories(["Cafe"]),
        FilterPatch::new().sort(SortKey::Rating),
        FilterPatch::new().status(StatusFilter::Rated),
        FilterPatch::new().owners([fx.scenario.friend("bo").id]),
    ];
    for patch in patches {
        if fx.feed.visible_page().has_more {
            fx.feed.next_page().await.unwrap();
        }
        let outcome = fx.feed.set_filter(patch).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded(PageOrigin::Remote));
        assert_eq!(fx.feed.pagination().page_number(), 1);
    }
}

#[test]
fn page_keys_differ_across_filters() {
    let s = uniform(4);
    let roster = Roster::new(s.friends.clone());
    let base = FilterState::default();
    let mut rated = base.clone();
    rated.status = StatusFilter::Rated;
    let mut searched = base.clone();
    searched.search_text = "Porto".into();

    let keys = [
        PageKey::new(&roster, &base, 0),
        PageKey::new(&roster, &rated, 0),
        PageKey::new(&roster, &searched, 0),
        PageKey::new(&roster, &base, 18),
    ];
    for (i, a) in keys.iter().enumerate() {
        for b in &keys[i + 1..] {
            assert_ne!(a, b);
        }
    }

    let mut respelled = base.clone();
    respelled.search_text = "   ".into();
    assert_eq!(PageKey::new(&roster, &respelled, 0), keys[0]);
}

#[tokio::test]
async fn returning_to_a_filter_reuses_its_cached_page() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();

    fx.feed.set_filter(FilterPatch::new().search("porto")).await.unwrap();
    let outcome = fx.feed.set_filter(FilterPatch::new().search("")).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded(PageOrigin::PageCache));
}

#[tokio::test]
async fn status_change_drops_cached_pages() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();

    fx.feed.set_filter(FilterPatch::new().status(StatusFilter::Rated)).await.unwrap();
    let outcome = fx.feed.set_filter(FilterPatch::new().status(StatusFilter::All)).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded(PageOrigin::Remote));
}

#[tokio::test]
async fn unchanged_patch_does_nothing() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();
    let before = fx.store.query_count();

    let outcome = fx.feed.set_filter(FilterPatch::new().status(StatusFilter::All)).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Unchanged);
    assert_eq!(fx.store.queries_at(0), 1);
    assert!(fx.store.query_count() - before <= 1, "only a background prefetch may run");
}

/// Guarantee: status changes do not recompute corpus-wide counts.
#[tokio::test]
async fn status_change_keeps_metadata() {
    let fx = Fixture::new(two_friends());
    fx.feed.mount().await.unwrap();
    assert_eq!(fx.store.count_count(), 1);

    for status in [StatusFilter::Wishlist, StatusFilter::Rated, StatusFilter::All] {
        fx.feed.set_filter(FilterPatch::new().status(status)).await.unwrap();
    }
    fx.feed.set_filter(FilterPatch::new().search("ana")).await.unwrap();

    assert_eq!(fx.store.count_count(), 1);
    let counts = fx.feed.visible_page().filter_counts;
    assert_eq!(counts.total_count, 17, "counts stay corpus-wide under filters");
}

/// Guarantee: once the roster TTL lapses and the friend list differs,
/// counts are recomputed for the new roster.
#[tokio::test(start_paused = true)]
async fn roster_change_recomputes_counts() {
    let fx = Fixture::new(two_friends());
    fx.feed.mount().await.unwrap();
    assert_eq!(fx.feed.visible_page().filter_counts.total_count, 17);

    let ana = fx.scenario.friend("ana").clone();
    fx.graph.set_friends(fx.scenario.user, [ana]);
    fx.feed.go_to_page(1).await.unwrap();
    assert_eq!(
        fx.feed.visible_page().filter_counts.total_count,
        17,
        "the cached roster is still in use"
    );
    assert_eq!(fx.store.count_count(), 1);

    tokio::time::advance(Duration::from_secs(31 * 60)).await;
    fx.feed.go_to_page(1).await.unwrap();

    let page = fx.feed.visible_page();
    assert_eq!(fx.graph.call_count(), 2);
    assert_eq!(fx.store.count_count(), 2);
    assert_eq!(page.filter_counts.total_count, 12);
    assert_eq!(page.filter_counts.wishlist_count, 2);
    assert!(!page.counts_are_approximate);
    assert!(page.items.iter().all(|i| i.owner.username == "ana"));
}

/// Guarantee: A has 10 rated + 2 wishlist, B has 5 rated; the wishlist view
/// shows exactly A's two wishlisted places on one page.
#[tokio::test]
async fn wishlist_scenario() {
    let fx = Fixture::new(two_friends());
    fx.feed.mount().await.unwrap();

    fx.feed
        .set_filter(FilterPatch::new().status(StatusFilter::Wishlist))
        .await
        .unwrap();
    let page = fx.feed.visible_page();

    assert_eq!(page.filter_counts.wishlist_count, 2);
    assert_eq!(page.filter_counts.rated_count, 15);
    assert!(!page.counts_are_approximate);
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|i| i.is_wishlist));
    assert!(page.items.iter().all(|i| i.owner.username == "ana"));
    assert!(!page.has_more);
}

#[tokio::test]
async fn search_matches_name_category_or_city() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();

    fx.feed.set_filter(FilterPatch::new().search("  PORTO ")).await.unwrap();
    let page = fx.feed.visible_page();
    assert!(!page.items.is_empty());
    assert!(page.items.iter().all(|i| i.city == "Porto"));

    fx.feed.set_filter(FilterPatch::new().search("bakery")).await.unwrap();
    assert!(fx.feed.visible_page().items.iter().all(|i| i.category == "Bakery"));
}

#[tokio::test]
async fn owner_sort_is_finished_client_side() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();
    fx.feed.set_filter(FilterPatch::new().sort(SortKey::Owner)).await.unwrap();

    let items = fx.feed.visible_page().items;
    assert_eq!(items.len(), 18);
    assert!(items.windows(2).all(|w| w[0].owner.label() <= w[1].owner.label()));
    assert_eq!(items[0].owner.label(), "Ana Lima");
}

/// Guarantee: N keystrokes inside the quiet window produce one query.
#[tokio::test(start_paused = true)]
async fn keystroke_burst_queries_once() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();
    let before = fx.store.queries_at(0);

    for text in ["r", "ra", "rat", "rate"] {
        fx.feed.type_search(text);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(fx.feed.search_draft(), "rate");
    assert_eq!(fx.feed.filter().search_text, "");

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(fx.store.queries_at(0), before + 1);
    assert_eq!(fx.feed.filter().search_text, "rate");
}

/// Guarantee: N keystrokes spaced beyond the quiet window produce N queries.
#[tokio::test(start_paused = true)]
async fn spaced_keystrokes_query_each_time() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();
    let before = fx.store.queries_at(0);

    for text in ["r", "ra", "rat"] {
        fx.feed.type_search(text);
        tokio::time::sleep(Duration::from_millis(700)).await;
    }
    assert_eq!(fx.store.queries_at(0), before + 3);
}

#[tokio::test(start_paused = true)]
async fn submit_bypasses_debounce() {
    let fx = Fixture::new(uniform(40));
    fx.feed.mount().await.unwrap();
    let before = fx.store.queries_at(0);

    fx.feed.type_search("porto");
    let outcome = fx.feed.submit_search().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded(PageOrigin::Remote));
    assert_eq!(fx.store.queries_at(0), before + 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fx.store.queries_at(0), before + 1, "the pending timer was cancelled");
}
