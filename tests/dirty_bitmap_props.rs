//! Property tests for byte-range → page marking.

use std::collections::BTreeSet;

use proptest::prelude::*;
use trackvfs::{PageId, Tracker};

const PAGE_SIZES: [u32; 4] = [512, 1024, 4096, 65536];

fn expected_pages(offset: u64, length: usize, page_size: u32) -> BTreeSet<u32> {
    let start = offset / u64::from(page_size);
    let end = (offset + length as u64 - 1) / u64::from(page_size);
    (start as u32..=end as u32).collect()
}

fn as_set(pages: Vec<PageId>) -> BTreeSet<u32> {
    pages.into_iter().map(u32::from).collect()
}

proptest! {
    /// Marking a range dirties exactly the pages it overlaps.
    #[test]
    fn prop_mark_covers_exact_pages(
        page_size in prop::sample::select(PAGE_SIZES.to_vec()),
        offset in 0u64..(1 << 24),
        length in 1usize..100_000,
    ) {
        let mut tracker = Tracker::new("db", page_size);
        tracker.mark_dirty(offset, length).unwrap();

        let expected = expected_pages(offset, length, page_size);
        prop_assert_eq!(as_set(tracker.dirty_pages()), expected.clone());
        prop_assert_eq!(tracker.total_pages(), expected.last().unwrap() + 1);
    }

    /// Marking the same range twice equals marking it once.
    #[test]
    fn prop_mark_is_idempotent(
        offset in 0u64..(1 << 22),
        length in 1usize..50_000,
    ) {
        let mut once = Tracker::new("db", 4096);
        once.mark_dirty(offset, length).unwrap();

        let mut twice = Tracker::new("db", 4096);
        twice.mark_dirty(offset, length).unwrap();
        twice.mark_dirty(offset, length).unwrap();

        prop_assert_eq!(once.dirty_pages(), twice.dirty_pages());
        prop_assert_eq!(once.total_pages(), twice.total_pages());
    }

    /// A sequence of marks yields the union of their pages, ascending.
    #[test]
    fn prop_marks_accumulate(
        ranges in prop::collection::vec((0u64..(1 << 22), 1usize..20_000), 1..20),
    ) {
        let mut tracker = Tracker::new("db", 4096);
        let mut expected = BTreeSet::new();
        let mut max_total = 0;

        for (offset, length) in ranges {
            tracker.mark_dirty(offset, length).unwrap();
            let pages = expected_pages(offset, length, 4096);
            max_total = max_total.max(pages.last().unwrap() + 1);
            expected.extend(pages);

            // Page count only ever grows.
            prop_assert_eq!(tracker.total_pages(), max_total);
        }

        let dirty: Vec<u32> = tracker.dirty_pages().into_iter().map(u32::from).collect();
        prop_assert_eq!(dirty, expected.into_iter().collect::<Vec<_>>());
    }

    /// Clearing leaves the page count and drops every bit.
    #[test]
    fn prop_clear_keeps_total_pages(
        offset in 0u64..(1 << 22),
        length in 1usize..50_000,
    ) {
        let mut tracker = Tracker::new("db", 4096);
        tracker.mark_dirty(offset, length).unwrap();
        let total = tracker.total_pages();

        tracker.clear_all();

        prop_assert!(tracker.dirty_pages().is_empty());
        prop_assert_eq!(tracker.total_pages(), total);
    }

    /// Truncation-style single-byte marks touch exactly one page.
    #[test]
    fn prop_single_byte_marks_one_page(new_size in 0u64..(1 << 26)) {
        let mut tracker = Tracker::new("db", 4096);
        tracker.mark_dirty(new_size, 1).unwrap();

        prop_assert_eq!(
            tracker.dirty_pages(),
            vec![PageId::from_offset(new_size, 4096)]
        );
    }
}
