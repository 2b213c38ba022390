//! Duplicate-request suppression
//!
//! At most one fetch per key is outstanding. A second caller for the same
//! key is told so immediately instead of queueing behind the first.

use dashmap::DashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Set of keys with a fetch in flight
#[derive(Debug)]
pub struct InFlightSet<K>
where
    K: Hash + Eq + Clone + Debug,
{
    keys: Arc<DashSet<K>>,
}

impl<K> InFlightSet<K>
where
    K: Hash + Eq + Clone + Debug,
{
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: Arc::new(DashSet::new()),
        }
    }

    /// Claim `key`; `None` if another fetch already holds it
    ///
    /// The claim is released when the guard drops, including on early
    /// return or task cancellation.
    #[must_use]
    pub fn try_begin(&self, key: K) -> Option<InFlightGuard<K>> {
        if self.keys.insert(key.clone()) {
            Some(InFlightGuard {
                keys: Arc::clone(&self.keys),
                key,
            })
        } else {
            tracing::debug!(?key, "duplicate in-flight request suppressed");
            None
        }
    }

    /// Whether `key` is currently claimed
    #[must_use]
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    /// Number of outstanding claims
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing is in flight
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K> Default for InFlightSet<K>
where
    K: Hash + Eq + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Claim on one key; releases it on drop
#[derive(Debug)]
pub struct InFlightGuard<K>
where
    K: Hash + Eq + Clone + Debug,
{
    keys: Arc<DashSet<K>>,
    key: K,
}

impl<K> Drop for InFlightGuard<K>
where
    K: Hash + Eq + Clone + Debug,
{
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused_until_release() {
        let set = InFlightSet::new();
        let guard = set.try_begin("page-2").unwrap();
        assert!(set.try_begin("page-2").is_none());
        assert!(set.try_begin("page-3").is_some());
        assert!(set.is_in_flight(&"page-2"));

        drop(guard);
        assert!(!set.is_in_flight(&"page-2"));
        assert!(set.try_begin("page-2").is_some());
    }
}
