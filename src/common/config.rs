//! Configuration for the tracking layer.

/// Page size used when the caller does not supply one (4KB).
///
/// This matches SQLite's default page size. Every tracker created by a
/// registry inherits the registry's page size and keeps it for life.
pub const DEFAULT_PAGE_SIZE: u32 = 4096;

/// Name under which the tracking decorator registers itself.
pub const TRACKING_VFS_NAME: &str = "tracking";

/// Backend wrapped when no base backend is named.
pub const DEFAULT_BASE_VFS: &str = "memfs";

/// Longest pathname the built-in backends accept.
pub const MAX_PATHNAME: usize = 512;

/// Environment variable naming the base backend.
pub const ENV_BASE_VFS: &str = "TRACKVFS_BASE_VFS";

/// Environment variable holding the page size.
pub const ENV_PAGE_SIZE: &str = "TRACKVFS_PAGE_SIZE";

/// Settings for [`TrackingRegistry::initialize_with`].
///
/// [`TrackingRegistry::initialize_with`]: crate::tracking::TrackingRegistry::initialize_with
///
/// # Example
/// ```
/// use trackvfs::common::config::{TrackingConfig, DEFAULT_PAGE_SIZE};
///
/// let config = TrackingConfig::new("memfs", 0);
/// assert_eq!(config.effective_page_size(), DEFAULT_PAGE_SIZE);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Name of the backend to wrap.
    pub base_vfs: String,
    /// Requested page size in bytes; zero means "use the default".
    pub page_size: u32,
}

impl TrackingConfig {
    /// Create a config for the named base backend.
    pub fn new(base_vfs: impl Into<String>, page_size: u32) -> Self {
        Self {
            base_vfs: base_vfs.into(),
            page_size,
        }
    }

    /// Build a config from `TRACKVFS_BASE_VFS` / `TRACKVFS_PAGE_SIZE`.
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let base_vfs = std::env::var(ENV_BASE_VFS)
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_VFS.to_string());
        let page_size = std::env::var(ENV_PAGE_SIZE)
            .ok()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Self { base_vfs, page_size }
    }

    /// The page size trackers will actually use.
    #[inline]
    pub fn effective_page_size(&self) -> u32 {
        effective_page_size(self.page_size)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_VFS, DEFAULT_PAGE_SIZE)
    }
}

/// Resolve a requested page size, falling back to [`DEFAULT_PAGE_SIZE`].
#[inline]
pub fn effective_page_size(requested: u32) -> u32 {
    if requested > 0 {
        requested
    } else {
        DEFAULT_PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_page_size_is_power_of_two() {
        assert!(DEFAULT_PAGE_SIZE.is_power_of_two());
        assert_eq!(DEFAULT_PAGE_SIZE, 4096);
    }

    #[test]
    fn test_effective_page_size() {
        assert_eq!(effective_page_size(0), DEFAULT_PAGE_SIZE);
        assert_eq!(effective_page_size(1024), 1024);
        assert_eq!(TrackingConfig::new("os", 0).effective_page_size(), 4096);
    }

    #[test]
    fn test_default_config() {
        let config = TrackingConfig::default();
        assert_eq!(config.base_vfs, "memfs");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_from_env() {
        // Single test touches these variables to avoid races between tests.
        std::env::set_var(ENV_BASE_VFS, "os");
        std::env::set_var(ENV_PAGE_SIZE, "8192");
        let config = TrackingConfig::from_env();
        assert_eq!(config.base_vfs, "os");
        assert_eq!(config.page_size, 8192);

        std::env::set_var(ENV_PAGE_SIZE, "not-a-number");
        assert_eq!(TrackingConfig::from_env().page_size, DEFAULT_PAGE_SIZE);

        std::env::remove_var(ENV_BASE_VFS);
        std::env::remove_var(ENV_PAGE_SIZE);
        assert_eq!(TrackingConfig::from_env(), TrackingConfig::default());
    }
}
