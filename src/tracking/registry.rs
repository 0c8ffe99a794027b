//! Tracker registry - per-filename dirty state and the install lifecycle.
//!
//! [`TrackerTable`] maps normalized filenames to [`Tracker`]s and is shared
//! between the registry and the decorator it installs. [`TrackingRegistry`]
//! owns the table and brackets the decorator's registration with the host
//! between [`initialize`](TrackingRegistry::initialize) and
//! [`shutdown`](TrackingRegistry::shutdown).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::common::config::{self, TrackingConfig, DEFAULT_PAGE_SIZE, TRACKING_VFS_NAME};
use crate::common::{Error, PageId, Result};
use crate::tracking::{Tracker, TrackerInfo, TrackingStats, TrackingVfs};
use crate::vfs::{Vfs, VfsRegistry};

/// Shared handle to a tracker.
pub type TrackerRef = Arc<Mutex<Tracker>>;

/// Strip a single leading `/`. Nothing else is rewritten.
///
/// ```
/// use trackvfs::tracking::normalize_filename;
///
/// assert_eq!(normalize_filename("/db.sqlite"), "db.sqlite");
/// assert_eq!(normalize_filename("//db.sqlite"), "/db.sqlite");
/// ```
#[inline]
pub fn normalize_filename(filename: &str) -> &str {
    filename.strip_prefix('/').unwrap_or(filename)
}

/// Trackers keyed by normalized filename.
pub struct TrackerTable {
    /// Page size given to newly created trackers.
    page_size: AtomicU32,
    trackers: Mutex<HashMap<String, TrackerRef>>,
    stats: TrackingStats,
}

impl TrackerTable {
    /// Create an empty table.
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: AtomicU32::new(config::effective_page_size(page_size)),
            trackers: Mutex::new(HashMap::new()),
            stats: TrackingStats::new(),
        }
    }

    /// Page size for trackers created from now on.
    #[inline]
    pub fn page_size(&self) -> u32 {
        self.page_size.load(Ordering::Relaxed)
    }

    fn set_page_size(&self, page_size: u32) {
        self.page_size
            .store(config::effective_page_size(page_size), Ordering::Relaxed);
    }

    /// Find the tracker for `filename`, creating it if needed.
    ///
    /// Returns `None` for a name that is empty after normalization.
    pub fn get_or_create(&self, filename: &str) -> Option<TrackerRef> {
        let key = normalize_filename(filename);
        if key.is_empty() {
            return None;
        }

        let mut trackers = self.trackers.lock();
        if let Some(tracker) = trackers.get(key) {
            return Some(Arc::clone(tracker));
        }

        let tracker = Arc::new(Mutex::new(Tracker::new(key, self.page_size())));
        trackers.insert(key.to_string(), Arc::clone(&tracker));
        Some(tracker)
    }

    /// Find the tracker for `filename` without creating one.
    pub fn get(&self, filename: &str) -> Option<TrackerRef> {
        self.trackers
            .lock()
            .get(normalize_filename(filename))
            .cloned()
    }

    /// Number of trackers.
    pub fn len(&self) -> usize {
        self.trackers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every tracker. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut trackers = self.trackers.lock();
        let count = trackers.len();
        trackers.clear();
        count
    }

    pub fn stats(&self) -> &TrackingStats {
        &self.stats
    }
}

/// Process-wide tracking state with an explicit lifecycle.
///
/// # Lifecycle
/// ```text
///   new() ──▶ initialize() ──▶ [decorator is the host default] ──▶ shutdown()
///                  │                                                 │
///                  └── already initialized: Ok, no-op                └── drops all trackers
/// ```
///
/// Dirty-page queries work in any state. Before `initialize` (or after
/// `shutdown`) trackers are created with [`DEFAULT_PAGE_SIZE`].
///
/// # Thread Safety
/// All state sits behind `parking_lot` mutexes, so a registry can be shared
/// across threads. Dirty state is only coherent if the engine's file
/// operations are themselves serialized.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use trackvfs::tracking::TrackingRegistry;
/// use trackvfs::vfs::{OpenFlags, VfsRegistry};
///
/// let host = Arc::new(VfsRegistry::with_builtin());
/// let registry = TrackingRegistry::new(Arc::clone(&host));
/// registry.initialize("memfs", 4096).unwrap();
///
/// let vfs = host.default_vfs().unwrap();
/// let flags = OpenFlags::READWRITE | OpenFlags::CREATE;
/// let (mut file, _) = vfs.open(Some("/app.db"), flags).unwrap();
/// file.write(&[1u8; 10], 0).unwrap();
///
/// let dirty = registry.get_dirty_pages("app.db").unwrap();
/// assert_eq!(dirty.len(), 1);
/// ```
pub struct TrackingRegistry {
    host: Arc<VfsRegistry>,
    table: Arc<TrackerTable>,
    /// The decorator while installed.
    installed: Mutex<Option<Arc<TrackingVfs>>>,
}

impl TrackingRegistry {
    /// Create an uninitialized registry bound to a host.
    pub fn new(host: Arc<VfsRegistry>) -> Self {
        Self {
            host,
            table: Arc::new(TrackerTable::new(DEFAULT_PAGE_SIZE)),
            installed: Mutex::new(None),
        }
    }

    /// Wrap the backend named `base_vfs` and install the decorator as the
    /// host's default backend.
    ///
    /// A `page_size` of zero selects [`DEFAULT_PAGE_SIZE`]. Calling this
    /// while already initialized succeeds without changing anything.
    ///
    /// # Errors
    /// - `Error::NotFound` if no backend is registered as `base_vfs`
    /// - `Error::Registration` if the host rejects the decorator
    pub fn initialize(&self, base_vfs: &str, page_size: u32) -> Result<()> {
        let mut installed = self.installed.lock();
        if installed.is_some() {
            debug!(base_vfs, "tracking already initialized");
            return Ok(());
        }

        let base = match self.host.find(Some(base_vfs)) {
            Some(base) => base,
            None => {
                warn!(base_vfs, "base backend not found");
                return Err(Error::NotFound(format!("backend '{}'", base_vfs)));
            }
        };

        self.table.set_page_size(page_size);

        let vfs = Arc::new(TrackingVfs::new(base, Arc::clone(&self.table)));
        if let Err(e) = self.host.register(Arc::clone(&vfs) as Arc<dyn Vfs>, true) {
            warn!(error = %e, "failed to register tracking backend");
            self.table.set_page_size(DEFAULT_PAGE_SIZE);
            return Err(e);
        }

        *installed = Some(vfs);
        info!(
            base_vfs,
            page_size = self.table.page_size(),
            "tracking initialized (default backend)"
        );
        Ok(())
    }

    /// [`initialize`](Self::initialize) from a [`TrackingConfig`].
    pub fn initialize_with(&self, config: &TrackingConfig) -> Result<()> {
        self.initialize(&config.base_vfs, config.page_size)
    }

    /// Drop every tracker and uninstall the decorator.
    ///
    /// Safe to call when never initialized. Handles opened through the
    /// decorator keep working but are no longer tracked.
    pub fn shutdown(&self) {
        let mut installed = self.installed.lock();
        if installed.take().is_some() {
            self.host.unregister(TRACKING_VFS_NAME);
        }

        let dropped = self.table.clear();
        self.table.set_page_size(DEFAULT_PAGE_SIZE);
        self.table.stats().reset();
        info!(trackers = dropped, "tracking shutdown complete");
    }

    /// Whether the decorator is currently installed.
    pub fn is_initialized(&self) -> bool {
        self.installed.lock().is_some()
    }

    /// Page size given to new trackers.
    pub fn page_size(&self) -> u32 {
        self.table.page_size()
    }

    /// The installed decorator, if initialized.
    pub fn tracking_vfs(&self) -> Option<Arc<TrackingVfs>> {
        self.installed.lock().clone()
    }

    /// Find or create the tracker for `filename`.
    ///
    /// Returns `None` for an empty filename.
    pub fn get_or_create(&self, filename: &str) -> Option<TrackerRef> {
        self.table.get_or_create(filename)
    }

    /// Snapshot of `filename`'s dirty pages, ascending.
    ///
    /// Creates the tracker if it does not exist yet.
    ///
    /// # Errors
    /// `Error::InvalidFilename` if `filename` is empty.
    pub fn get_dirty_pages(&self, filename: &str) -> Result<Vec<PageId>> {
        let tracker = self
            .table
            .get_or_create(filename)
            .ok_or(Error::InvalidFilename)?;

        let pages = tracker.lock().dirty_pages();
        debug!(filename, count = pages.len(), "found dirty pages");
        Ok(pages)
    }

    /// Mark every page of `filename` clean.
    ///
    /// Succeeds without effect if nothing was ever written.
    ///
    /// # Errors
    /// `Error::InvalidFilename` if `filename` is empty.
    pub fn reset_dirty(&self, filename: &str) -> Result<()> {
        let tracker = self
            .table
            .get_or_create(filename)
            .ok_or(Error::InvalidFilename)?;

        tracker.lock().clear_all();
        self.table.stats().resets.fetch_add(1, Ordering::Relaxed);
        debug!(filename, "reset dirty pages");
        Ok(())
    }

    /// Snapshot of a tracker's state, without creating one.
    pub fn tracker(&self, filename: &str) -> Option<TrackerInfo> {
        self.table.get(filename).map(|t| t.lock().info())
    }

    /// Number of trackers.
    pub fn tracker_count(&self) -> usize {
        self.table.len()
    }

    pub fn stats(&self) -> &TrackingStats {
        self.table.stats()
    }
}

impl Drop for TrackingRegistry {
    fn drop(&mut self) {
        if self.installed.get_mut().is_some() {
            self.shutdown();
        }
    }
}
