//! Per-file tracking record.

use crate::common::config;
use crate::common::{PageId, Result};
use crate::tracking::DirtyBitmap;

/// Dirty-page state for one logical filename.
///
/// Created lazily (on first query or open) and kept until the owning
/// registry shuts down. Page size is fixed at creation.
#[derive(Debug)]
pub struct Tracker {
    filename: String,
    page_size: u32,
    /// Allocated on the first mark.
    bitmap: Option<DirtyBitmap>,
    is_open: bool,
}

impl Tracker {
    /// Create a tracker with no pages and no bitmap.
    ///
    /// A `page_size` of zero selects [`DEFAULT_PAGE_SIZE`](config::DEFAULT_PAGE_SIZE).
    pub fn new(filename: impl Into<String>, page_size: u32) -> Self {
        Self {
            filename: filename.into(),
            page_size: config::effective_page_size(page_size),
            bitmap: None,
            is_open: false,
        }
    }

    /// Normalized filename this tracker is keyed by.
    #[inline]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[inline]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Highest page index ever touched, plus one.
    #[inline]
    pub fn total_pages(&self) -> u32 {
        self.bitmap.as_ref().map_or(0, DirtyBitmap::total_pages)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    #[inline]
    pub fn set_open(&mut self, is_open: bool) {
        self.is_open = is_open;
    }

    /// Whether a bitmap has been allocated yet.
    #[inline]
    pub fn has_bitmap(&self) -> bool {
        self.bitmap.is_some()
    }

    /// Mark the pages overlapping `[offset, offset + length)` dirty.
    ///
    /// A zero `length` is a no-op. Returns `true` if the bitmap grew.
    ///
    /// # Errors
    /// - `Error::OutOfMemory` if the bitmap cannot grow
    /// - `Error::PageOutOfRange` if the range ends past page `u32::MAX - 1`
    ///
    /// On error no bits change.
    pub fn mark_dirty(&mut self, offset: u64, length: usize) -> Result<bool> {
        if length == 0 {
            return Ok(false);
        }

        let last_byte = offset.saturating_add(length as u64 - 1);
        let start = PageId::from_offset(offset, self.page_size);
        let end = PageId::from_offset(last_byte, self.page_size);

        self.bitmap
            .get_or_insert_with(DirtyBitmap::new)
            .mark_range(start.0, end.0)
    }

    /// Snapshot of dirty page indices, ascending.
    pub fn dirty_pages(&self) -> Vec<PageId> {
        self.bitmap
            .as_ref()
            .map(DirtyBitmap::dirty_pages)
            .unwrap_or_default()
    }

    /// Number of dirty pages.
    pub fn dirty_count(&self) -> usize {
        self.bitmap.as_ref().map_or(0, DirtyBitmap::dirty_count)
    }

    /// Whether `page` is dirty.
    pub fn is_dirty(&self, page: PageId) -> bool {
        self.bitmap.as_ref().is_some_and(|b| b.is_dirty(page))
    }

    /// Mark every page clean. No-op if nothing was ever marked.
    pub fn clear_all(&mut self) {
        if let Some(bitmap) = self.bitmap.as_mut() {
            bitmap.clear_all();
        }
    }

    /// Point-in-time copy of this tracker's state.
    pub fn info(&self) -> TrackerInfo {
        TrackerInfo {
            filename: self.filename.clone(),
            page_size: self.page_size,
            total_pages: self.total_pages(),
            dirty_count: self.dirty_count(),
            is_open: self.is_open,
        }
    }
}

/// Copy of a tracker's state handed to callers outside the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerInfo {
    pub filename: String,
    pub page_size: u32,
    pub total_pages: u32,
    pub dirty_count: usize,
    pub is_open: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(ids: &[u32]) -> Vec<PageId> {
        ids.iter().copied().map(PageId::new).collect()
    }

    #[test]
    fn test_new_tracker() {
        let tracker = Tracker::new("db.sqlite", 4096);
        assert_eq!(tracker.filename(), "db.sqlite");
        assert_eq!(tracker.total_pages(), 0);
        assert!(!tracker.has_bitmap());
        assert!(!tracker.is_open());
        assert!(tracker.dirty_pages().is_empty());
    }

    #[test]
    fn test_zero_page_size_uses_default() {
        let mut tracker = Tracker::new("db.sqlite", 0);
        assert_eq!(tracker.page_size(), config::DEFAULT_PAGE_SIZE);

        tracker.mark_dirty(4096, 1).unwrap();
        assert_eq!(tracker.dirty_pages(), vec![PageId::new(1)]);
    }

    #[test]
    fn test_mark_dirty_within_page() {
        let mut tracker = Tracker::new("db", 4096);
        tracker.mark_dirty(0, 10).unwrap();
        assert_eq!(tracker.dirty_pages(), pages(&[0]));
        assert_eq!(tracker.total_pages(), 1);
    }

    #[test]
    fn test_mark_dirty_spanning_boundary() {
        let mut tracker = Tracker::new("db", 4096);
        tracker.mark_dirty(4090, 20).unwrap();
        assert_eq!(tracker.dirty_pages(), pages(&[0, 1]));
    }

    #[test]
    fn test_mark_dirty_exact_page_end() {
        let mut tracker = Tracker::new("db", 4096);
        // Last byte is 8191: still page 1.
        tracker.mark_dirty(4096, 4096).unwrap();
        assert_eq!(tracker.dirty_pages(), pages(&[1]));
        assert_eq!(tracker.total_pages(), 2);
    }

    #[test]
    fn test_zero_length_is_noop() {
        let mut tracker = Tracker::new("db", 4096);
        assert!(!tracker.mark_dirty(1 << 20, 0).unwrap());
        assert!(!tracker.has_bitmap());
        assert_eq!(tracker.total_pages(), 0);
    }

    #[test]
    fn test_clear_all_keeps_total_pages() {
        let mut tracker = Tracker::new("db", 1024);
        tracker.mark_dirty(0, 5000).unwrap();
        assert_eq!(tracker.dirty_count(), 5);

        tracker.clear_all();

        assert!(tracker.dirty_pages().is_empty());
        assert_eq!(tracker.total_pages(), 5);
        assert!(tracker.has_bitmap());
    }

    #[test]
    fn test_clear_without_bitmap_is_noop() {
        let mut tracker = Tracker::new("db", 4096);
        tracker.clear_all();
        assert!(!tracker.has_bitmap());
    }

    #[test]
    fn test_info_snapshot() {
        let mut tracker = Tracker::new("db", 4096);
        tracker.set_open(true);
        tracker.mark_dirty(8192, 1).unwrap();

        let info = tracker.info();
        assert_eq!(info.filename, "db");
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.dirty_count, 1);
        assert!(info.is_open);
        assert!(tracker.is_dirty(PageId::new(2)));
        assert!(!tracker.is_dirty(PageId::new(1)));
    }
}
