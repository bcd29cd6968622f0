// crates/coursebook-core/src/pagination.rs
// ============================================================================
// Module: Pagination Engine
// Description: Deterministic offset pagination over filtered collections.
// Purpose: Turn (filtered count, page request) into clamped page bounds so
//          stores fetch exactly one bounded slice.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The pagination engine is pure arithmetic: given the filtered total count,
//! the page size, and the requested page, [`PageBounds::compute`] produces
//! the clamped page number, the total page count, and the row offset. Stores
//! run one filtered `COUNT` query, compute bounds, then fetch the single
//! `LIMIT`/`OFFSET` slice ordered by the immutable row id — the full
//! collection is never materialized.
//!
//! ## Invariants
//! - Ordering is by a unique ascending key, so for fixed data no item
//!   appears on two pages and none is skipped.
//! - `requested_page` above the last page clamps to the last page; below 1
//!   clamps to 1. An empty collection yields page 1 of 0 with no items.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Page Request
// ============================================================================

/// Client-requested page for a list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based requested page number; clamped into range.
    pub page: u64,
    /// Items per page; validated to be non-zero by configuration.
    pub page_size: u64,
}

// ============================================================================
// SECTION: Page Bounds
// ============================================================================

/// Clamped bounds for a single page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    /// Effective 1-based page number after clamping.
    pub page: u64,
    /// Total pages for the filtered collection (0 when empty).
    pub total_pages: u64,
    /// Total items matching the filter.
    pub total_count: u64,
    /// Row offset of the first item on the page.
    pub offset: u64,
    /// Items per page.
    pub page_size: u64,
}

impl PageBounds {
    /// Computes clamped bounds for `total_count` items and the request.
    ///
    /// A `page_size` of zero is treated as one to keep the arithmetic total;
    /// configuration validation rejects zero sizes before requests arrive.
    #[must_use]
    pub const fn compute(total_count: u64, request: PageRequest) -> Self {
        let page_size = if request.page_size == 0 { 1 } else { request.page_size };
        let total_pages = total_count.div_ceil(page_size);
        let last = if total_pages == 0 { 1 } else { total_pages };
        let page = if request.page > last {
            last
        } else if request.page < 1 {
            1
        } else {
            request.page
        };
        Self {
            page,
            total_pages,
            total_count,
            offset: (page - 1) * page_size,
            page_size,
        }
    }
}

// ============================================================================
// SECTION: Page
// ============================================================================

/// One page of items plus the bounds it was fetched under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page, in unique-key ascending order.
    pub items: Vec<T>,
    /// Effective 1-based page number.
    pub page: u64,
    /// Total pages for the filtered collection.
    pub total_pages: u64,
    /// Items per page.
    pub page_size: u64,
    /// Total items matching the filter.
    pub total_count: u64,
}

impl<T> Page<T> {
    /// Assembles a page from fetched items and their bounds.
    #[must_use]
    pub fn new(items: Vec<T>, bounds: PageBounds) -> Self {
        Self {
            items,
            page: bounds.page,
            total_pages: bounds.total_pages,
            page_size: bounds.page_size,
            total_count: bounds.total_count,
        }
    }

    /// Maps the item type while preserving the bounds.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            total_pages: self.total_pages,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use proptest::prelude::*;

    use super::*;

    const fn request(page: u64, page_size: u64) -> PageRequest {
        PageRequest {
            page,
            page_size,
        }
    }

    #[test]
    fn empty_collection_yields_page_one_of_zero() {
        let bounds = PageBounds::compute(0, request(7, 10));
        assert_eq!(bounds.page, 1);
        assert_eq!(bounds.total_pages, 0);
        assert_eq!(bounds.offset, 0);
    }

    #[test]
    fn partial_last_page_counts_as_a_page() {
        // 29 items at size 10: pages 1-3, last page holds 9.
        let bounds = PageBounds::compute(29, request(3, 10));
        assert_eq!(bounds.total_pages, 3);
        assert_eq!(bounds.offset, 20);
        let exact = PageBounds::compute(30, request(1, 10));
        assert_eq!(exact.total_pages, 3);
        let overflow = PageBounds::compute(31, request(1, 10));
        assert_eq!(overflow.total_pages, 4);
    }

    #[test]
    fn requested_page_clamps_into_range() {
        let over = PageBounds::compute(25, request(99, 10));
        assert_eq!(over.page, 3);
        assert_eq!(over.offset, 20);
        let under = PageBounds::compute(25, request(0, 10));
        assert_eq!(under.page, 1);
        assert_eq!(under.offset, 0);
    }

    proptest! {
        #[test]
        fn pages_partition_the_collection(
            total in 0u64..10_000,
            page_size in 1u64..200,
        ) {
            let bounds = PageBounds::compute(total, request(1, page_size));
            let mut seen = 0;
            for page in 1..=bounds.total_pages.max(1) {
                let b = PageBounds::compute(total, request(page, page_size));
                prop_assert_eq!(b.page, page.min(bounds.total_pages.max(1)));
                let len = total.saturating_sub(b.offset).min(page_size);
                seen += len;
            }
            // Every item lands on exactly one page.
            prop_assert_eq!(seen, total);
        }

        #[test]
        fn offsets_never_overlap(
            total in 1u64..10_000,
            page_size in 1u64..200,
            a in 1u64..100,
            b in 1u64..100,
        ) {
            let ba = PageBounds::compute(total, request(a, page_size));
            let bb = PageBounds::compute(total, request(b, page_size));
            if ba.page != bb.page {
                let (lo, hi) = if ba.offset < bb.offset { (ba, bb) } else { (bb, ba) };
                prop_assert!(lo.offset + page_size <= hi.offset);
            }
        }
    }
}
