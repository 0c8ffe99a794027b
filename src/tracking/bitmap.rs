//! Growable dirty-page bitmap.
//!
//! One bit per page, packed into `u32` words (LSB first). The bitmap only
//! ever grows: the page count is the highest page index ever marked plus
//! one, and [`DirtyBitmap::clear_all`] unsets bits without shrinking.

use bitvec::prelude::*;

use crate::common::{Error, PageId, Result};

/// Bits per backing word.
const WORD_BITS: usize = u32::BITS as usize;

/// Dirty bits for the pages `[0, total_pages)` of one file.
///
/// # Invariants
/// - `words.len() * 32 >= total_pages`
/// - Every bit at index `>= total_pages` is zero. Bits are only set inside
///   the live range and `total_pages` never shrinks, so growth can expose
///   spare word bits without leaking stale state.
///
/// # Example
/// ```
/// use trackvfs::tracking::DirtyBitmap;
/// use trackvfs::PageId;
///
/// let mut bitmap = DirtyBitmap::new();
/// bitmap.mark_range(2, 3).unwrap();
/// assert_eq!(bitmap.total_pages(), 4);
/// assert_eq!(bitmap.dirty_pages(), vec![PageId::new(2), PageId::new(3)]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct DirtyBitmap {
    words: Vec<u32>,
    total_pages: u32,
}

impl DirtyBitmap {
    /// Create an empty bitmap covering zero pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages covered (highest marked page + 1).
    #[inline]
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Number of backing words currently allocated.
    #[inline]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Mark pages `[start, end]` dirty, growing to cover `end` first.
    ///
    /// Returns `true` if the bitmap had to grow.
    ///
    /// # Errors
    /// `Error::OutOfMemory` if growth cannot allocate. The bitmap is left
    /// exactly as it was.
    pub fn mark_range(&mut self, start: u32, end: u32) -> Result<bool> {
        debug_assert!(start <= end, "inverted page range");
        let required = end as u64 + 1;
        let grew = self.grow_to(required)?;

        let (start, end) = (start as usize, end as usize);
        self.words.view_bits_mut::<Lsb0>()[start..=end].fill(true);
        Ok(grew)
    }

    /// Whether `page` is marked dirty. Pages past the end are clean.
    pub fn is_dirty(&self, page: PageId) -> bool {
        let index = page.0 as usize;
        index < self.total_pages as usize && self.live_bits()[index]
    }

    /// Snapshot of the dirty page indices, ascending.
    pub fn dirty_pages(&self) -> Vec<PageId> {
        self.live_bits()
            .iter_ones()
            .map(|index| PageId::new(index as u32))
            .collect()
    }

    /// Number of dirty pages.
    pub fn dirty_count(&self) -> usize {
        self.live_bits().count_ones()
    }

    /// Unset every bit. Page count and storage are unchanged.
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    fn live_bits(&self) -> &BitSlice<u32, Lsb0> {
        &self.words.view_bits::<Lsb0>()[..self.total_pages as usize]
    }

    /// Grow to cover `required` pages, zero-filling new words.
    fn grow_to(&mut self, required: u64) -> Result<bool> {
        if required <= u64::from(self.total_pages) {
            return Ok(false);
        }
        let total_pages = u32::try_from(required).map_err(|_| Error::PageOutOfRange(required))?;

        let words_needed = (total_pages as usize).div_ceil(WORD_BITS);
        if words_needed > self.words.len() {
            self.words
                .try_reserve_exact(words_needed - self.words.len())
                .map_err(|_| Error::OutOfMemory)?;
            self.words.resize(words_needed, 0);
        }

        self.total_pages = total_pages;
        Ok(true)
    }
}
