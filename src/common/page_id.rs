//! Page identifier type.

use std::fmt;

/// Zero-based index of a page within a tracked file.
///
/// Page N covers bytes `[N × page_size, (N + 1) × page_size)`. Using `u32`
/// matches the width the sync collaborator receives.
///
/// # Example
/// ```
/// use trackvfs::PageId;
///
/// let page_id = PageId::from_offset(8192, 4096);
/// assert_eq!(page_id, PageId::new(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Page containing byte `offset`, saturating at `u32::MAX`.
    #[inline]
    pub fn from_offset(offset: u64, page_size: u32) -> Self {
        let index = offset / u64::from(page_size);
        PageId(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Byte offset of the first byte in this page.
    #[inline]
    pub fn byte_offset(&self, page_size: u32) -> u64 {
        u64::from(self.0) * u64::from(page_size)
    }

    /// The raw index.
    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<PageId> for u32 {
    fn from(page_id: PageId) -> u32 {
        page_id.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_new() {
        let pid = PageId::new(42);
        assert_eq!(pid.0, 42);
        assert_eq!(u32::from(pid), 42);
    }

    #[test]
    fn test_page_id_from_offset() {
        assert_eq!(PageId::from_offset(0, 4096), PageId::new(0));
        assert_eq!(PageId::from_offset(4095, 4096), PageId::new(0));
        assert_eq!(PageId::from_offset(4096, 4096), PageId::new(1));
        assert_eq!(PageId::from_offset(u64::MAX, 1), PageId::new(u32::MAX));
    }

    #[test]
    fn test_page_id_byte_offset() {
        assert_eq!(PageId::new(3).byte_offset(4096), 12288);
    }

    #[test]
    fn test_page_id_ordering() {
        assert!(PageId::new(1) < PageId::new(2));
        assert!(PageId::new(5) > PageId::new(3));
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42)), "Page(42)");
    }
}
