//! The tracking decorator.
//!
//! [`TrackingVfs`] wraps a real backend and presents the same [`Vfs`]
//! surface. Every call is forwarded first; only a successful `write` or
//! `truncate` on a named file updates that file's [`Tracker`]. Results
//! from the real backend are returned unchanged.

use std::any::Any;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

use crate::common::config::TRACKING_VFS_NAME;
use crate::common::Result;
use crate::tracking::{Tracker, TrackerTable};
use crate::vfs::{
    AccessFlags, DeviceCharacteristics, LibraryHandle, LockLevel, OpenFlags, SymbolAddr,
    SyncFlags, Vfs, VfsFile,
};

/// Backend decorator that records dirty pages per filename.
///
/// Installed by [`TrackingRegistry::initialize`] under the name
/// `"tracking"`.
///
/// [`TrackingRegistry::initialize`]: crate::tracking::TrackingRegistry::initialize
pub struct TrackingVfs {
    base: Arc<dyn Vfs>,
    table: Arc<TrackerTable>,
}

impl TrackingVfs {
    /// Wrap `base`, recording into `table`.
    pub fn new(base: Arc<dyn Vfs>, table: Arc<TrackerTable>) -> Self {
        Self { base, table }
    }

    /// The wrapped backend.
    pub fn base(&self) -> &Arc<dyn Vfs> {
        &self.base
    }
}

impl Vfs for TrackingVfs {
    fn name(&self) -> &str {
        TRACKING_VFS_NAME
    }

    fn max_pathname(&self) -> usize {
        self.base.max_pathname()
    }

    fn open(&self, name: Option<&str>, flags: OpenFlags) -> Result<(Box<dyn VfsFile>, OpenFlags)> {
        let (real, out_flags) = self.base.open(name, flags)?;

        let tracker = name.and_then(|name| self.table.get_or_create(name));
        if let Some(tracker) = &tracker {
            tracker.lock().set_open(true);
        }

        let file = TrackingFile {
            real,
            binding: TrackerBinding {
                tracker: tracker.as_ref().map(Arc::downgrade),
                table: Arc::clone(&self.table),
            },
        };
        Ok((Box::new(file), out_flags))
    }

    fn delete(&self, name: &str, sync_dir: bool) -> Result<()> {
        self.base.delete(name, sync_dir)
    }

    fn access(&self, name: &str, flags: AccessFlags) -> Result<bool> {
        self.base.access(name, flags)
    }

    fn full_pathname(&self, name: &str) -> Result<String> {
        self.base.full_pathname(name)
    }

    fn dl_open(&self, path: &str) -> Option<LibraryHandle> {
        self.base.dl_open(path)
    }

    fn dl_error(&self) -> Option<String> {
        self.base.dl_error()
    }

    fn dl_sym(&self, handle: LibraryHandle, symbol: &str) -> Option<SymbolAddr> {
        self.base.dl_sym(handle, symbol)
    }

    fn dl_close(&self, handle: LibraryHandle) {
        self.base.dl_close(handle)
    }

    fn randomness(&self, buf: &mut [u8]) -> usize {
        self.base.randomness(buf)
    }

    fn sleep(&self, duration: Duration) -> Duration {
        self.base.sleep(duration)
    }

    fn current_time_millis(&self) -> i64 {
        self.base.current_time_millis()
    }

    fn current_time(&self) -> f64 {
        self.base.current_time()
    }

    fn last_error(&self) -> Option<String> {
        self.base.last_error()
    }

    fn set_system_call(&self, name: &str, addr: Option<SymbolAddr>) -> Result<()> {
        self.base.set_system_call(name, addr)
    }

    fn get_system_call(&self, name: &str) -> Option<SymbolAddr> {
        self.base.get_system_call(name)
    }

    fn next_system_call(&self, name: Option<&str>) -> Option<String> {
        self.base.next_system_call(name)
    }
}

/// Which operation produced a mark.
#[derive(Debug, Clone, Copy)]
enum Mark {
    Write,
    Truncate,
}

/// A file opened through [`TrackingVfs`].
///
/// Owns the real handle. The tracker reference is weak: trackers belong to
/// the registry and outlive handles, and a registry shutdown simply leaves
/// the handle untracked.
struct TrackingFile {
    real: Box<dyn VfsFile>,
    binding: TrackerBinding,
}

/// Link from a handle to its tracker.
///
/// Marks the tracker closed when dropped, whether the handle was closed
/// or simply went out of scope.
struct TrackerBinding {
    /// `None` for anonymous files.
    tracker: Option<Weak<Mutex<Tracker>>>,
    table: Arc<TrackerTable>,
}

impl Drop for TrackerBinding {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.as_ref().and_then(Weak::upgrade) {
            tracker.lock().set_open(false);
        }
    }
}

impl TrackerBinding {
    /// Record `[offset, offset + length)` after a successful operation.
    ///
    /// Failures are logged and counted, never returned.
    fn record(&self, mark: Mark, offset: u64, length: usize) {
        let stats = self.table.stats();
        let Some(tracker) = self.tracker.as_ref().and_then(Weak::upgrade) else {
            if let Mark::Write = mark {
                stats.untracked_writes.fetch_add(1, Ordering::Relaxed);
            }
            return;
        };

        let mut tracker = tracker.lock();
        match tracker.mark_dirty(offset, length) {
            Ok(grew) => {
                if grew {
                    stats.bitmap_growths.fetch_add(1, Ordering::Relaxed);
                }
                let counter = match mark {
                    Mark::Write => &stats.tracked_writes,
                    Mark::Truncate => &stats.tracked_truncates,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                stats.tracking_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    filename = tracker.filename(),
                    offset,
                    length,
                    error = %e,
                    "failed to grow dirty bitmap; change not tracked"
                );
            }
        }
    }
}

impl VfsFile for TrackingFile {
    fn close(self: Box<Self>) -> Result<()> {
        let TrackingFile { real, binding } = *self;
        let result = real.close();
        drop(binding);
        result
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        self.real.read(buf, offset)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        let result = self.real.write(buf, offset);
        if result.is_ok() {
            self.binding.record(Mark::Write, offset, buf.len());
        }
        result
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        let result = self.real.truncate(size);
        if result.is_ok() {
            // Flag the page at the new end of file so the shrink is visible.
            self.binding.record(Mark::Truncate, size, 1);
        }
        result
    }

    fn sync(&mut self, flags: SyncFlags) -> Result<()> {
        self.real.sync(flags)
    }

    fn file_size(&self) -> Result<u64> {
        self.real.file_size()
    }

    fn lock(&mut self, level: LockLevel) -> Result<()> {
        self.real.lock(level)
    }

    fn unlock(&mut self, level: LockLevel) -> Result<()> {
        self.real.unlock(level)
    }

    fn check_reserved_lock(&self) -> Result<bool> {
        self.real.check_reserved_lock()
    }

    fn file_control(&mut self, op: i32, arg: &mut dyn Any) -> Result<()> {
        self.real.file_control(op, arg)
    }

    fn sector_size(&self) -> u32 {
        self.real.sector_size()
    }

    fn device_characteristics(&self) -> DeviceCharacteristics {
        self.real.device_characteristics()
    }
}
