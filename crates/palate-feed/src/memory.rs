//! In-memory collaborators
//!
//! Reference implementations of [`RemoteStore`], [`SocialGraph`] and
//! [`AuthContext`] over plain collections. They evaluate the full predicate
//! vocabulary, count calls, and can inject latency and failures, which makes
//! them the backend for tests and the simulator.

use crate::error::RemoteError;
use crate::query::{CountProjection, RemoteQuery};
use crate::remote::{AuthContext, RemoteStore, SocialGraph};
use async_trait::async_trait;
use palate_model::{CountRow, FriendRef, RawRecord, UserId};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Record store backed by a vector
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<RawRecord>>,
    latency: Mutex<Duration>,
    query_log: Mutex<Vec<RemoteQuery>>,
    failing_offsets: Mutex<BTreeSet<usize>>,
    /// Page queries received
    pub query_calls: AtomicU64,
    /// Counting queries received
    pub count_calls: AtomicU64,
    /// Fail every page query
    pub fail_queries: AtomicBool,
    /// Fail every counting query
    pub fail_counts: AtomicBool,
}

impl MemoryStore {
    /// Store holding `records`
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = RawRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Delay every call by `latency`
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    /// Change the per-call delay
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Add a record
    pub fn insert(&self, record: RawRecord) {
        self.records.write().push(record);
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Fail page queries at `offset` (prefetches included)
    pub fn fail_offset(&self, offset: usize) {
        self.failing_offsets.lock().insert(offset);
    }

    /// Stop failing page queries at `offset`
    pub fn heal_offset(&self, offset: usize) {
        self.failing_offsets.lock().remove(&offset);
    }

    /// Every page query received, in arrival order
    #[must_use]
    pub fn query_log(&self) -> Vec<RemoteQuery> {
        self.query_log.lock().clone()
    }

    /// Page queries received at `offset`
    #[must_use]
    pub fn queries_at(&self, offset: usize) -> usize {
        self.query_log
            .lock()
            .iter()
            .filter(|q| q.offset == offset)
            .count()
    }

    /// Page queries received so far
    #[must_use]
    pub fn query_count(&self) -> u64 {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Counting queries received so far
    #[must_use]
    pub fn count_count(&self) -> u64 {
        self.count_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn query(&self, query: &RemoteQuery) -> Result<Vec<RawRecord>, RemoteError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.query_log.lock().push(query.clone());
        self.delay().await;

        if self.fail_queries.load(Ordering::SeqCst) || self.failing_offsets.lock().contains(&query.offset) {
            return Err(RemoteError::Unavailable("injected query failure".to_string()));
        }

        let mut matched: Vec<RawRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));

        Ok(matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|mut r| {
                if !query.projection.include_photos {
                    r.photo_refs.clear();
                }
                r
            })
            .collect())
    }

    async fn bulk_count(
        &self,
        owners: &[UserId],
        _projection: &CountProjection,
    ) -> Result<Vec<CountRow>, RemoteError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("injected count failure".to_string()));
        }

        let owners: BTreeSet<&UserId> = owners.iter().collect();
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| owners.contains(&r.owner_id))
            .map(CountRow::from)
            .collect())
    }
}

/// Friend lists keyed by user
#[derive(Debug, Default)]
pub struct MemorySocialGraph {
    friends: RwLock<HashMap<UserId, Vec<FriendRef>>>,
    latency: Mutex<Duration>,
    /// Calls received
    pub calls: AtomicU64,
    /// Fail every call
    pub fail: AtomicBool,
}

impl MemorySocialGraph {
    /// Empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph where `user` is friends with `friends`
    #[must_use]
    pub fn with_friends(user: UserId, friends: impl IntoIterator<Item = FriendRef>) -> Self {
        let graph = Self::new();
        graph.set_friends(user, friends);
        graph
    }

    /// Replace `user`'s friends
    pub fn set_friends(&self, user: UserId, friends: impl IntoIterator<Item = FriendRef>) {
        self.friends.write().insert(user, friends.into_iter().collect());
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Calls received so far
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocialGraph for MemorySocialGraph {
    async fn friends_of(&self, user: UserId) -> Result<Vec<FriendRef>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("injected social graph failure".to_string()));
        }
        Ok(self.friends.read().get(&user).cloned().unwrap_or_default())
    }
}

/// Auth context with a switchable user
#[derive(Debug, Default)]
pub struct StaticAuth {
    user: RwLock<Option<UserId>>,
}

impl StaticAuth {
    /// Signed in as `user`
    #[must_use]
    pub fn signed_in(user: UserId) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    /// Nobody signed in
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Switch to `user`
    pub fn sign_in(&self, user: UserId) {
        *self.user.write() = Some(user);
    }

    /// Sign the current user out
    pub fn sign_out(&self) {
        *self.user.write() = None;
    }
}

impl AuthContext for StaticAuth {
    fn current_user_id(&self) -> Option<UserId> {
        *self.user.read()
    }
}
