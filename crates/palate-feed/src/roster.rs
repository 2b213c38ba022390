//! Roster resolution
//!
//! Resolves the signed-in user's friends to a [`Roster`]. The roster changes
//! rarely, so it is cached per user with a long TTL; a cache hit performs no
//! remote call.

use crate::error::FeedError;
use crate::remote::{bounded, SocialGraph};
use palate_cache::{CacheStats, TtlCache};
use palate_model::{Roster, UserId};
use std::sync::Arc;
use std::time::Duration;

/// Cached friend roster lookup
pub struct RosterResolver {
    graph: Arc<dyn SocialGraph>,
    cache: TtlCache<UserId, Arc<Roster>>,
    timeout: Duration,
}

impl RosterResolver {
    /// Create a resolver
    #[must_use]
    pub fn new(graph: Arc<dyn SocialGraph>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            graph,
            cache: TtlCache::new("roster", 1_024, ttl),
            timeout,
        }
    }

    /// Resolve `user`'s roster, from cache while it is valid
    ///
    /// # Errors
    /// `FeedError::UpstreamUnavailable` if the social graph fails or times out
    pub async fn resolve(&self, user: UserId) -> Result<Arc<Roster>, FeedError> {
        if let Some(roster) = self.cache.get(&user).await {
            tracing::debug!(%user, friends = roster.len(), "roster cache hit");
            return Ok(roster);
        }

        let friends = bounded("roster", self.timeout, self.graph.friends_of(user)).await?;
        let roster = Arc::new(Roster::new(friends));
        tracing::info!(
            %user,
            friends = roster.len(),
            fingerprint = %roster.fingerprint().short(),
            "roster resolved"
        );

        self.cache.insert(user, Arc::clone(&roster)).await;
        Ok(roster)
    }

    /// Forget every roster
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Cache counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl std::fmt::Debug for RosterResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterResolver")
            .field("ttl", &self.cache.ttl())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::remote::MockSocialGraph;
    use palate_model::FriendRef;

    fn friend(name: &str) -> FriendRef {
        FriendRef::new(UserId::new(), name)
    }

    #[tokio::test(start_paused = true)]
    async fn second_resolve_is_served_from_cache() {
        let mut graph = MockSocialGraph::new();
        graph
            .expect_friends_of()
            .times(1)
            .returning(|_| Ok(vec![friend("ana"), friend("bo")]));

        let resolver = RosterResolver::new(Arc::new(graph), Duration::from_secs(1800), Duration::from_secs(5));
        let user = UserId::new();

        let first = resolver.resolve(user).await.unwrap();
        let second = resolver.resolve(user).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(resolver.stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_roster_is_fetched_again() {
        let mut graph = MockSocialGraph::new();
        graph
            .expect_friends_of()
            .times(2)
            .returning(|_| Ok(vec![friend("ana")]));

        let resolver = RosterResolver::new(Arc::new(graph), Duration::from_secs(1800), Duration::from_secs(5));
        let user = UserId::new();

        resolver.resolve(user).await.unwrap();
        tokio::time::advance(Duration::from_secs(1800)).await;
        resolver.resolve(user).await.unwrap();
    }

    #[tokio::test]
    async fn failure_is_upstream_unavailable_and_not_cached() {
        let mut graph = MockSocialGraph::new();
        let mut calls = 0;
        graph.expect_friends_of().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(RemoteError::Unavailable("connection reset".into()))
            } else {
                Ok(vec![])
            }
        });

        let resolver = RosterResolver::new(Arc::new(graph), Duration::from_secs(1800), Duration::from_secs(5));
        let user = UserId::new();

        let err = resolver.resolve(user).await.unwrap_err();
        assert!(matches!(err, FeedError::UpstreamUnavailable { operation: "roster", .. }));
        assert!(resolver.resolve(user).await.unwrap().is_empty());
    }
}
