//! Page-number bookkeeping

use serde::{Deserialize, Serialize};

/// Current page, fixed page size, and whether another page may exist
///
/// `has_more` is false whenever the last fetch returned fewer than
/// `page_size` rows. Navigation replaces the displayed page; nothing here
/// accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    page_number: usize,
    page_size: usize,
    has_more: bool,
}

impl PaginationState {
    /// Start on page 1; `page_size` is clamped to at least 1
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_number: 1,
            page_size: page_size.max(1),
            has_more: false,
        }
    }

    /// 1-based page number
    #[inline]
    #[must_use]
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    /// Fixed page size
    #[inline]
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether a further page may exist
    #[inline]
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Whether a previous page exists
    #[inline]
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    /// Row offset of the current page
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset_of(self.page_number)
    }

    /// Row offset of an arbitrary 1-based page
    ///
    /// Saturates for page numbers past the addressable range; such a page is
    /// simply empty.
    #[inline]
    #[must_use]
    pub fn offset_of(&self, page_number: usize) -> usize {
        page_number.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Page number containing `offset`
    #[inline]
    #[must_use]
    pub fn page_of(&self, offset: usize) -> usize {
        offset / self.page_size + 1
    }

    /// Record a completed fetch at `offset` that returned `fetched` rows
    pub fn record_fetch(&mut self, offset: usize, fetched: usize) {
        self.page_number = self.page_of(offset);
        self.has_more = fetched >= self.page_size;
    }

    /// Mark the end of the corpus without moving
    pub fn mark_exhausted(&mut self) {
        self.has_more = false;
    }

    /// Back to page 1 with nothing known about further pages
    pub fn reset(&mut self) {
        self.page_number = 1;
        self.has_more = false;
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(18)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn forty_items_in_pages_of_eighteen() {
        let mut p = PaginationState::new(18);
        p.record_fetch(0, 18);
        assert!(p.has_more());
        p.record_fetch(18, 18);
        assert_eq!(p.page_number(), 2);
        assert!(p.has_more());
        p.record_fetch(36, 4);
        assert_eq!(p.page_number(), 3);
        assert!(!p.has_more());
    }

    #[test]
    fn reset_returns_to_first_page() {
        let mut p = PaginationState::new(10);
        p.record_fetch(20, 10);
        p.reset();
        assert_eq!(p.page_number(), 1);
        assert_eq!(p.offset(), 0);
        assert!(!p.has_previous());
    }

    #[test]
    fn huge_page_number_saturates() {
        let p = PaginationState::new(18);
        assert_eq!(p.offset_of(usize::MAX), usize::MAX);
        assert_eq!(p.offset_of(usize::MAX / 2), usize::MAX);
        assert_eq!(p.offset_of(0), 0);
    }

    proptest! {
        #[test]
        fn prop_has_more_iff_full_page(size in 1usize..50, page in 1usize..20, fetched in 0usize..60) {
            let mut p = PaginationState::new(size);
            let offset = p.offset_of(page);
            p.record_fetch(offset, fetched.min(size));
            prop_assert_eq!(p.page_number(), page);
            prop_assert_eq!(p.has_more(), fetched >= size);
        }
    }
}
