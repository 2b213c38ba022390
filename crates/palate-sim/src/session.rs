//! Scripted browsing session
//!
//! Mounts a feed over a generated corpus, optionally applies a status filter
//! and a search, then walks forward through the pages and back again,
//! recording where every page came from.

use crate::corpus::{generate, CorpusSpec};
use anyhow::{Context, Result};
use palate_feed::{
    FeedConfig, FeedController, LoadOutcome, MemorySocialGraph, MemoryStore, StaticAuth,
};
use palate_model::{FilterPatch, MetadataSnapshot, StatusFilter};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

/// What to do in one session
#[derive(Debug, Clone)]
pub(crate) struct Script {
    pub(crate) corpus: CorpusSpec,
    pub(crate) page_size: usize,
    pub(crate) status: Option<StatusFilter>,
    pub(crate) search: Option<String>,
    pub(crate) pages: usize,
    pub(crate) latency: Duration,
}

/// One navigation step
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Step {
    pub(crate) action: &'static str,
    pub(crate) outcome: String,
    pub(crate) page: usize,
    pub(crate) items: usize,
    pub(crate) has_more: bool,
    pub(crate) first: Option<String>,
}

/// Everything a session observed
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Report {
    pub(crate) friends: usize,
    pub(crate) records: usize,
    pub(crate) steps: Vec<Step>,
    pub(crate) counts: MetadataSnapshot,
    pub(crate) counts_are_approximate: bool,
    pub(crate) status: StatusFilter,
    pub(crate) status_count: usize,
    pub(crate) page_queries: u64,
    pub(crate) count_queries: u64,
    pub(crate) page_cache_hits: u64,
    pub(crate) prefetch_consumed: u64,
    pub(crate) location: String,
}

impl Report {
    pub(crate) fn render_text(&self) -> String {
        let mut out = String::new();
        let approx = if self.counts_are_approximate { " (approximate)" } else { "" };
        let _ = writeln!(out, "Corpus: {} friends, {} records", self.friends, self.records);
        let _ = writeln!(
            out,
            "Counts: total {} | rated {} | wishlist {}{approx}",
            self.counts.total_count, self.counts.rated_count, self.counts.wishlist_count,
        );
        let _ = writeln!(out, "Status: {} ({} matching)\n", self.status, self.status_count);
        for step in &self.steps {
            let _ = writeln!(
                out,
                "  {:<8} {:<22} page {:>3}  {:>3} items  more={:<5} {}",
                step.action,
                step.outcome,
                step.page,
                step.items,
                step.has_more,
                step.first.as_deref().unwrap_or("-"),
            );
        }
        let _ = writeln!(
            out,
            "\nRemote: {} page queries, {} count queries",
            self.page_queries, self.count_queries
        );
        let _ = writeln!(
            out,
            "Cache:  {} page hits, {} prefetches consumed",
            self.page_cache_hits, self.prefetch_consumed
        );
        let _ = writeln!(out, "Link:   ?{}", self.location);
        out
    }
}

fn step(feed: &FeedController, action: &'static str, outcome: &LoadOutcome) -> Step {
    let page = feed.visible_page();
    Step {
        action,
        outcome: format!("{outcome:?}"),
        page: page.page_number,
        items: page.items.len(),
        has_more: page.has_more,
        first: page
            .items
            .first()
            .map(|i| format!("{} ({})", i.name, i.owner.label())),
    }
}

/// Run `script` to completion
pub(crate) async fn run(script: Script) -> Result<Report> {
    let corpus = generate(script.corpus);
    tracing::info!(
        friends = corpus.friends.len(),
        records = corpus.records.len(),
        seed = script.corpus.seed,
        "corpus generated"
    );

    let store = Arc::new(MemoryStore::new(corpus.records.clone()).with_latency(script.latency));
    let graph = Arc::new(MemorySocialGraph::with_friends(
        corpus.user,
        corpus.friends.clone(),
    ));
    let auth = Arc::new(StaticAuth::signed_in(corpus.user));
    let config = FeedConfig::new().with_page_size(script.page_size);
    let feed = FeedController::new(config, auth, graph, store.clone())
        .context("building feed controller")?;

    let mut steps = Vec::new();
    let outcome = feed.mount().await.context("mounting feed")?;
    steps.push(step(&feed, "mount", &outcome));

    if let Some(status) = script.status {
        let outcome = feed
            .set_filter(FilterPatch::new().status(status))
            .await
            .context("applying status filter")?;
        steps.push(step(&feed, "status", &outcome));
    }
    if let Some(search) = script.search {
        let outcome = feed
            .set_filter(FilterPatch::new().search(search))
            .await
            .context("applying search")?;
        steps.push(step(&feed, "search", &outcome));
    }

    let mut forward = 0;
    while forward < script.pages {
        feed.wait_for_prefetch().await;
        let outcome = feed.next_page().await.context("advancing page")?;
        if !matches!(outcome, LoadOutcome::Loaded(_)) {
            steps.push(step(&feed, "next", &outcome));
            break;
        }
        steps.push(step(&feed, "next", &outcome));
        forward += 1;
    }
    for _ in 0..forward {
        let outcome = feed.previous_page().await.context("going back")?;
        steps.push(step(&feed, "previous", &outcome));
    }

    let page = feed.visible_page();
    let status = feed.filter().status;
    let stats = feed.stats();
    Ok(Report {
        friends: corpus.friends.len(),
        records: corpus.records.len(),
        steps,
        status_count: page.filter_counts.count_for_status(status),
        status,
        counts: page.filter_counts,
        counts_are_approximate: page.counts_are_approximate,
        page_queries: store.query_count(),
        count_queries: store.count_count(),
        page_cache_hits: stats.pages.pages.hits,
        prefetch_consumed: stats.pages.prefetch.consumed,
        location: feed.location().to_query_string(),
    })
}
