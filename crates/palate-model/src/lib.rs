//! Palate Model
//!
//! Plain data shared by every layer of the friends' activity feed:
//! - Identifiers for people and rated places
//! - The friend roster and its fingerprint
//! - Raw rows from the remote store and the validated [`ActivityItem`]
//! - Filter state, its deterministic signature, and deep-link encoding
//! - Corpus-wide counts and pagination bookkeeping
//!
//! Nothing in this crate performs I/O.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod digest;
pub mod error;
pub mod filter;
pub mod friend;
pub mod ids;
pub mod location;
pub mod metadata;
pub mod pagination;
pub mod record;

pub use digest::{Digest, DigestBuilder};
pub use error::{LocationError, RecordError};
pub use filter::{FilterChange, FilterPatch, FilterState, SortKey, StatusFilter};
pub use friend::{FriendRef, Roster};
pub use ids::{ItemId, UserId};
pub use location::FeedLocation;
pub use metadata::MetadataSnapshot;
pub use pagination::PaginationState;
pub use record::{ActivityItem, CountRow, RawRecord, MAX_RATING, UNCATEGORIZED};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
