//! Single-use prefetch slots
//!
//! A slot holds the speculative result for one key (user + offset). Slots
//! are not TTL-bound; they live until consumed or until the predicate set
//! changes. Each slot remembers the signature it was computed against and
//! the generation it was started in:
//!
//! - `take` removes the slot and only returns it if the signature matches
//! - `invalidate_all` bumps the generation, so a prefetch that was already
//!   running when filters changed cannot land afterwards

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct Slot<S, V> {
    signature: S,
    value: V,
}

/// Counters for the prefetch tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchStats {
    /// Slots filled
    pub stored: u64,
    /// Slots consumed by a navigation
    pub consumed: u64,
    /// Lookups that found no usable slot
    pub misses: u64,
    /// Results dropped because they were computed for an old signature or generation
    pub discarded: u64,
}

/// Speculative next-page results, consumed at most once
#[derive(Debug)]
pub struct PrefetchSlots<K, S, V>
where
    K: Hash + Eq,
{
    slots: DashMap<K, Slot<S, V>>,
    generation: AtomicU64,
    stored: AtomicU64,
    consumed: AtomicU64,
    misses: AtomicU64,
    discarded: AtomicU64,
}

impl<K, S, V> PrefetchSlots<K, S, V>
where
    K: Hash + Eq,
    S: PartialEq,
{
    /// Empty tier at generation 0
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            generation: AtomicU64::new(0),
            stored: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Current generation; capture it before starting a prefetch
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Store a finished prefetch
    ///
    /// Returns `false` (and drops the value) if the tier was invalidated
    /// since `generation` was captured.
    pub fn put(&self, key: K, generation: u64, signature: S, value: V) -> bool {
        if generation != self.generation() {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(generation, "prefetch landed after invalidation; dropped");
            return false;
        }
        self.slots.insert(key, Slot { signature, value });
        self.stored.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Remove and return the slot for `key` if it matches `signature`
    ///
    /// A mismatched slot is removed as well: it can never become valid.
    pub fn take(&self, key: &K, signature: &S) -> Option<V> {
        match self.slots.remove(key) {
            Some((_, slot)) if slot.signature == *signature => {
                self.consumed.fetch_add(1, Ordering::Relaxed);
                Some(slot.value)
            }
            Some(_) => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Whether a slot exists for `key`
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of filled slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is filled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every slot and fence off prefetches still in flight
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.slots.clear();
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> PrefetchStats {
        PrefetchStats {
            stored: self.stored.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

impl<K, S, V> Default for PrefetchSlots<K, S, V>
where
    K: Hash + Eq,
    S: PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_single_use() {
        let slots: PrefetchSlots<u32, &str, Vec<u8>> = PrefetchSlots::new();
        let gen = slots.generation();
        assert!(slots.put(18, gen, "sig", vec![1, 2]));

        assert_eq!(slots.take(&18, &"sig"), Some(vec![1, 2]));
        assert_eq!(slots.take(&18, &"sig"), None);

        let stats = slots.stats();
        assert_eq!(stats.consumed, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn mismatched_signature_is_never_served() {
        let slots: PrefetchSlots<u32, &str, u8> = PrefetchSlots::new();
        slots.put(18, slots.generation(), "old", 1);

        assert_eq!(slots.take(&18, &"new"), None);
        assert!(!slots.contains(&18));
        assert_eq!(slots.stats().discarded, 1);
    }

    #[test]
    fn put_after_invalidation_is_dropped() {
        let slots: PrefetchSlots<u32, &str, u8> = PrefetchSlots::new();
        let gen = slots.generation();
        slots.invalidate_all();

        assert!(!slots.put(18, gen, "sig", 1));
        assert!(slots.is_empty());
    }
}
