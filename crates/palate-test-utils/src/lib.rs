//! Testing utilities for the Palate workspace
//!
//! Shared corpora, friend builders, and a ready-wired feed over the
//! in-memory backend.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use palate_feed::{FeedConfig, FeedController, MemorySocialGraph, MemoryStore, StaticAuth};
use palate_model::{FriendRef, RawRecord, UserId};
use std::sync::Arc;

pub const CATEGORIES: [&str; 4] = ["Italian", "Japanese", "Cafe", "Bakery"];
pub const CITIES: [&str; 3] = ["Lisbon", "Porto", "Madrid"];

pub fn friend(username: &str) -> FriendRef {
    FriendRef::new(UserId::new(), username)
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Builds records with strictly decreasing `created_at`
///
/// Categories and cities cycle so facet filters have something to match.
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    records: Vec<RawRecord>,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self, owner: &FriendRef, prefix: &str) -> RawRecord {
        let seq = self.records.len();
        let mut raw = RawRecord::new(
            owner.id,
            format!("{prefix} {} {seq:03}", owner.username),
            base_time() - Duration::minutes(seq as i64),
        );
        raw.category = Some(CATEGORIES[seq % CATEGORIES.len()].to_string());
        raw.city = Some(CITIES[seq % CITIES.len()].to_string());
        raw.photo_refs = vec![format!("photos/{seq}.jpg")];
        raw
    }

    pub fn rated(mut self, owner: &FriendRef, count: usize) -> Self {
        for _ in 0..count {
            let mut raw = self.next(owner, "rated");
            raw.rating = Some(5.0 + (self.records.len() % 5) as f32);
            self.records.push(raw);
        }
        self
    }

    pub fn wishlist(mut self, owner: &FriendRef, count: usize) -> Self {
        for _ in 0..count {
            let mut raw = self.next(owner, "wish");
            raw.is_wishlist = true;
            self.records.push(raw);
        }
        self
    }

    pub fn build(self) -> Vec<RawRecord> {
        self.records
    }
}

/// A signed-in user, their friends, and everything those friends rated
#[derive(Debug, Clone)]
pub struct Scenario {
    pub user: UserId,
    pub friends: Vec<FriendRef>,
    pub records: Vec<RawRecord>,
}

impl Scenario {
    pub fn friend(&self, username: &str) -> &FriendRef {
        self.friends
            .iter()
            .find(|f| f.username == username)
            .unwrap_or_else(|| panic!("no friend named {username}"))
    }

    pub fn records_of(&self, username: &str) -> Vec<&RawRecord> {
        let id = self.friend(username).id;
        self.records.iter().filter(|r| r.owner_id == id).collect()
    }
}

/// Ana has 10 rated and 2 wishlisted places; Bo has 5 rated
pub fn two_friends() -> Scenario {
    let ana = friend("ana").with_display_name("Ana Lima");
    let bo = friend("bo").with_display_name("Bo Berg");
    let records = CorpusBuilder::new()
        .rated(&ana, 6)
        .wishlist(&ana, 1)
        .rated(&bo, 5)
        .rated(&ana, 4)
        .wishlist(&ana, 1)
        .build();
    Scenario {
        user: UserId::new(),
        friends: vec![ana, bo],
        records,
    }
}

/// `total` rated places split between two friends
pub fn uniform(total: usize) -> Scenario {
    let ana = friend("ana").with_display_name("Ana Lima");
    let bo = friend("bo").with_display_name("Bo Berg");
    let mut builder = CorpusBuilder::new();
    for i in 0..total {
        builder = builder.rated(if i % 2 == 0 { &ana } else { &bo }, 1);
    }
    Scenario {
        user: UserId::new(),
        friends: vec![ana, bo],
        records: builder.build(),
    }
}

/// A feed wired to in-memory collaborators, with handles to each
pub struct Fixture {
    pub scenario: Scenario,
    pub auth: Arc<StaticAuth>,
    pub graph: Arc<MemorySocialGraph>,
    pub store: Arc<MemoryStore>,
    pub feed: Arc<FeedController>,
}

impl Fixture {
    pub fn new(scenario: Scenario) -> Self {
        Self::with_config(scenario, FeedConfig::new())
    }

    pub fn with_config(scenario: Scenario, config: FeedConfig) -> Self {
        let auth = Arc::new(StaticAuth::signed_in(scenario.user));
        let graph = Arc::new(MemorySocialGraph::with_friends(
            scenario.user,
            scenario.friends.clone(),
        ));
        let store = Arc::new(MemoryStore::new(scenario.records.clone()));
        let feed = FeedController::new(config, auth.clone(), graph.clone(), store.clone())
            .expect("fixture config is valid");
        Self {
            scenario,
            auth,
            graph,
            store,
            feed,
        }
    }

    /// Ids shown on the current page, in order
    pub fn visible_ids(&self) -> Vec<palate_model::ItemId> {
        self.feed.visible_page().items.iter().map(|i| i.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_friends_has_expected_shape() {
        let s = two_friends();
        let ana = s.records_of("ana");
        let bo = s.records_of("bo");
        assert_eq!(ana.iter().filter(|r| r.is_rated()).count(), 10);
        assert_eq!(ana.iter().filter(|r| r.is_wishlist).count(), 2);
        assert_eq!(bo.iter().filter(|r| r.is_rated()).count(), 5);
        assert!(bo.iter().all(|r| !r.is_wishlist));
    }

    #[test]
    fn created_at_strictly_decreases() {
        let s = uniform(40);
        assert_eq!(s.records.len(), 40);
        assert!(s.records.windows(2).all(|w| w[0].created_at > w[1].created_at));
    }
}
