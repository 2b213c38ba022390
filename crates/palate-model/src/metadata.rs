//! Corpus-wide counts used for filter option badges

use crate::filter::StatusFilter;
use crate::record::{ActivityItem, CountRow, UNCATEGORIZED};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts across the whole roster's corpus, independent of pagination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    /// Every record
    pub total_count: usize,
    /// Records that are not wishlisted and carry a rating
    pub rated_count: usize,
    /// Wishlisted records
    pub wishlist_count: usize,
    /// Records per city (blank cities are not counted)
    pub city_histogram: BTreeMap<String, usize>,
    /// Records per category
    pub category_histogram: BTreeMap<String, usize>,
}

impl MetadataSnapshot {
    /// Aggregate the counting projection
    #[must_use]
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a CountRow>) -> Self {
        let mut snapshot = Self::default();
        for row in rows {
            snapshot.record(
                row.category.as_deref(),
                row.city.as_deref(),
                row.is_wishlist,
                row.has_rating,
            );
        }
        snapshot
    }

    /// Approximate counts from whatever items are loaded
    ///
    /// Undercounts the true corpus; used only when the bulk count failed.
    #[must_use]
    pub fn from_items(items: &[ActivityItem]) -> Self {
        let mut snapshot = Self::default();
        for item in items {
            snapshot.record(
                Some(&item.category),
                Some(&item.city),
                item.is_wishlist,
                item.rating.is_some(),
            );
        }
        snapshot
    }

    fn record(
        &mut self,
        category: Option<&str>,
        city: Option<&str>,
        is_wishlist: bool,
        has_rating: bool,
    ) {
        self.total_count += 1;
        if is_wishlist {
            self.wishlist_count += 1;
        } else if has_rating {
            self.rated_count += 1;
        }

        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED);
        *self
            .category_histogram
            .entry(category.to_string())
            .or_default() += 1;

        if let Some(city) = city.map(str::trim).filter(|c| !c.is_empty()) {
            *self.city_histogram.entry(city.to_string()).or_default() += 1;
        }
    }

    /// Badge count for a status option
    #[must_use]
    pub fn count_for_status(&self, status: StatusFilter) -> usize {
        match status {
            StatusFilter::All => self.total_count,
            StatusFilter::Rated => self.rated_count,
            StatusFilter::Wishlist => self.wishlist_count,
        }
    }
}
