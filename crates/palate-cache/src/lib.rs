//! Palate Cache
//!
//! The cache tiers behind the activity feed. Every tier is an owned,
//! constructor-injected object; nothing here is global.
//!
//! - [`TtlCache`]: moka-backed store whose entries are valid while
//!   `now - fetched_at < ttl`, measured on the tokio clock
//! - [`PrefetchSlots`]: single-use speculative results, dropped wholesale
//!   when the predicate set changes
//! - [`InFlightSet`]: suppresses a second request for a key that is already
//!   being fetched
//!
//! # Architecture
//!
//! ```text
//! navigation ──► PrefetchSlots::take ──hit──► page (slot removed)
//!                    │ miss
//!                    ▼
//!                TtlCache::get ──hit──► page
//!                    │ miss
//!                    ▼
//!          InFlightSet::try_begin ──busy──► suppressed
//!                    │
//!                    ▼
//!               remote fetch ──► TtlCache::insert
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod entry;
pub mod inflight;
pub mod prefetch;
pub mod ttl;

pub use entry::CacheEntry;
pub use inflight::{InFlightGuard, InFlightSet};
pub use prefetch::{PrefetchSlots, PrefetchStats};
pub use ttl::{CacheStats, TtlCache};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
