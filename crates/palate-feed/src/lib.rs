//! Palate Feed - friends' activity feed engine
//!
//! Aggregates rated places from everyone in a user's social graph into one
//! filtered, sorted, paginated feed:
//! - Resolves the friend roster (cached for 30 minutes)
//! - Computes corpus-wide counts with one bulk projection read
//! - Pushes filter predicates down into the remote store
//! - Serves pages from a short-TTL cache and a single-use prefetch tier
//! - Drives it all through a small state machine with debounced search,
//!   duplicate suppression and stale-response discard
//!
//! # Example
//!
//! ```rust,ignore
//! use palate_feed::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(user: UserId, friends: Vec<FriendRef>, rows: Vec<RawRecord>) -> Result<(), FeedError> {
//! let feed = FeedController::new(
//!     FeedConfig::new(),
//!     Arc::new(StaticAuth::signed_in(user)),
//!     Arc::new(MemorySocialGraph::with_friends(user, friends)),
//!     Arc::new(MemoryStore::new(rows)),
//! )?;
//!
//! feed.mount().await?;
//! feed.set_filter(FilterPatch::new().status(StatusFilter::Wishlist)).await?;
//! let page = feed.visible_page();
//! println!("{} of {} wishlisted", page.items.len(), page.filter_counts.wishlist_count);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod memory;
pub mod metadata;
pub mod pages;
pub mod query;
pub mod remote;
pub mod roster;

pub use config::FeedConfig;
pub use controller::{FeedController, FeedPhase, FeedStats, LoadOutcome, VisiblePage};
pub use debounce::Debouncer;
pub use error::{FeedError, RemoteError};
pub use memory::{MemorySocialGraph, MemoryStore, StaticAuth};
pub use metadata::MetadataAggregator;
pub use pages::{FetchedPage, PageKey, PageOrigin, PageSource, PageSourceStats};
pub use query::{
    sort_client_side, CountProjection, Direction, Field, Predicate, Projection, QueryBuilder,
    QueryPlan, RemoteQuery, SortSpec,
};
pub use remote::{AuthContext, RemoteStore, SocialGraph};
pub use roster::RosterResolver;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a feed
    pub use crate::{
        AuthContext, FeedConfig, FeedController, FeedError, FeedPhase, LoadOutcome,
        MemorySocialGraph, MemoryStore, RemoteStore, SocialGraph, StaticAuth, VisiblePage,
    };
    pub use palate_model::{
        ActivityItem, FeedLocation, FilterPatch, FilterState, FriendRef, RawRecord, SortKey,
        StatusFilter, UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
