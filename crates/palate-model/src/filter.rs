//! Filter state and its signature
//!
//! [`FilterState`] is the single mutable description of what the user is
//! looking at. Edits arrive as a [`FilterPatch`]; applying one reports a
//! [`FilterChange`] so the controller can decide between a full reset and a
//! plain re-query.

use crate::digest::Digest;
use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Result ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Newest first
    #[default]
    Recent,
    /// Highest rating first
    Rating,
    /// Place name A-Z
    Alphabetical,
    /// Friend display name A-Z
    Owner,
}

impl SortKey {
    /// Wire/deep-link name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Rating => "rating",
            Self::Alphabetical => "alphabetical",
            Self::Owner => "owner",
        }
    }

    /// Whether the final ordering needs owner display names
    ///
    /// The remote store does not know friend names, so these orderings are
    /// finished client-side after enrichment.
    #[must_use]
    pub const fn needs_client_sort(self) -> bool {
        matches!(self, Self::Alphabetical | Self::Owner)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recent" => Ok(Self::Recent),
            "rating" => Ok(Self::Rating),
            "alphabetical" => Ok(Self::Alphabetical),
            "owner" => Ok(Self::Owner),
            other => Err(other.to_string()),
        }
    }
}

/// Rated/wishlist selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Everything
    #[default]
    All,
    /// Rated, not wishlisted
    Rated,
    /// Wishlisted only
    Wishlist,
}

impl StatusFilter {
    /// Wire/deep-link name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Rated => "rated",
            Self::Wishlist => "wishlist",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "rated" => Ok(Self::Rated),
            "wishlist" => Ok(Self::Wishlist),
            other => Err(other.to_string()),
        }
    }
}

/// Every user-controlled filter field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Free-text search (applied value, not the typing draft)
    pub search_text: String,
    /// Ordering
    pub sort_key: SortKey,
    /// Rated/wishlist selector
    pub status: StatusFilter,
    /// Category membership; empty means any
    pub categories: BTreeSet<String>,
    /// City membership; empty means any
    pub cities: BTreeSet<String>,
    /// Contributing friends; empty means the whole roster
    pub owners: BTreeSet<UserId>,
}

impl FilterState {
    /// Create the default (unfiltered, most recent first) state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Search needle as sent to the store: trimmed, lowercased, `None` if blank
    #[must_use]
    pub fn search_needle(&self) -> Option<String> {
        let trimmed = self.search_text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
    }

    /// Deterministic signature of everything that affects query results
    ///
    /// Search is normalized first, so `"Pizza "` and `"pizza"` share cache
    /// entries. Set fields hash in sorted order.
    #[must_use]
    pub fn signature(&self) -> Digest {
        let mut b = Digest::builder("filter")
            .str(&self.search_needle().unwrap_or_default())
            .str(self.sort_key.as_str())
            .str(self.status.as_str())
            .u64(self.categories.len() as u64);
        for category in &self.categories {
            b = b.str(category);
        }
        b = b.u64(self.cities.len() as u64);
        for city in &self.cities {
            b = b.str(city);
        }
        b = b.u64(self.owners.len() as u64);
        for owner in &self.owners {
            b = b.bytes(owner.as_bytes());
        }
        b.finish()
    }

    /// Apply a partial update and report what actually changed
    pub fn apply(&mut self, patch: FilterPatch) -> FilterChange {
        let mut change = FilterChange::default();

        if let Some(text) = patch.search_text {
            let before = self.search_needle();
            self.search_text = text;
            change.search = before != self.search_needle();
        }
        if let Some(sort) = patch.sort_key {
            change.sort = sort != self.sort_key;
            self.sort_key = sort;
        }
        if let Some(status) = patch.status {
            change.status = status != self.status;
            self.status = status;
        }
        if let Some(categories) = patch.categories {
            change.facets |= categories != self.categories;
            self.categories = categories;
        }
        if let Some(cities) = patch.cities {
            change.facets |= cities != self.cities;
            self.cities = cities;
        }
        if let Some(owners) = patch.owners {
            change.facets |= owners != self.owners;
            self.owners = owners;
        }

        change
    }
}

/// Partial filter update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    /// New search text
    pub search_text: Option<String>,
    /// New sort key
    pub sort_key: Option<SortKey>,
    /// New status filter
    pub status: Option<StatusFilter>,
    /// New category set
    pub categories: Option<BTreeSet<String>>,
    /// New city set
    pub cities: Option<BTreeSet<String>>,
    /// New owner set
    pub owners: Option<BTreeSet<UserId>>,
}

impl FilterPatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch that replaces every field with `state`
    #[must_use]
    pub fn replace_all(state: FilterState) -> Self {
        Self {
            search_text: Some(state.search_text),
            sort_key: Some(state.sort_key),
            status: Some(state.status),
            categories: Some(state.categories),
            cities: Some(state.cities),
            owners: Some(state.owners),
        }
    }

    /// With search text
    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    /// With sort key
    #[must_use]
    pub fn sort(mut self, sort: SortKey) -> Self {
        self.sort_key = Some(sort);
        self
    }

    /// With status filter
    #[must_use]
    pub fn status(mut self, status: StatusFilter) -> Self {
        self.status = Some(status);
        self
    }

    /// With categories
    #[must_use]
    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    /// With cities
    #[must_use]
    pub fn cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cities = Some(cities.into_iter().map(Into::into).collect());
        self
    }

    /// With owners
    #[must_use]
    pub fn owners(mut self, owners: impl IntoIterator<Item = UserId>) -> Self {
        self.owners = Some(owners.into_iter().collect());
        self
    }
}

/// Which groups of fields a patch changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterChange {
    /// Rated/wishlist selector changed
    pub status: bool,
    /// Sort key changed
    pub sort: bool,
    /// Normalized search text changed
    pub search: bool,
    /// Category, city or owner sets changed
    pub facets: bool,
}

impl FilterChange {
    /// Nothing changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.status || self.sort || self.search || self.facets)
    }

    /// Whether cached pages and prefetches must be dropped wholesale
    #[inline]
    #[must_use]
    pub fn requires_cache_reset(&self) -> bool {
        self.status
    }
}
