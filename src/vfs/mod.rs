//! Storage backends - the byte-addressable file substrate.
//!
//! A backend implements [`Vfs`] (filesystem-level operations) and hands out
//! [`VfsFile`] handles (per-file operations). Backends are discovered by
//! name through a [`VfsRegistry`].
//!
//! # Components
//! - [`Vfs`] / [`VfsFile`] - The operation surface every backend exposes
//! - [`VfsRegistry`] - Named backend discovery with a default backend
//! - [`MemVfs`] - In-memory backend ("memfs")
//! - [`OsVfs`] - `std::fs` backend rooted at a directory ("os")

mod mem;
mod os;
mod registry;
mod types;

use std::any::Any;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::common::{Error, Result};

pub use mem::MemVfs;
pub use os::OsVfs;
pub use registry::VfsRegistry;
pub use types::{
    AccessFlags, DeviceCharacteristics, LibraryHandle, LockLevel, OpenFlags, SymbolAddr,
    SyncFlags,
};

/// Milliseconds between the Julian day epoch and the Unix epoch.
const UNIX_EPOCH_JULIAN_MS: i64 = 210_866_760_000_000;

/// Filesystem-level operations of a storage backend.
///
/// Everything except [`open`](Vfs::open), [`delete`](Vfs::delete),
/// [`access`](Vfs::access) and [`full_pathname`](Vfs::full_pathname) has a
/// default, so a minimal backend only implements file access.
pub trait Vfs: Send + Sync {
    /// Name the backend registers under.
    fn name(&self) -> &str;

    /// Longest pathname this backend accepts.
    fn max_pathname(&self) -> usize {
        crate::common::config::MAX_PATHNAME
    }

    /// Open a file. `None` asks for an anonymous temporary file.
    ///
    /// Returns the handle and the flags actually used.
    fn open(&self, name: Option<&str>, flags: OpenFlags) -> Result<(Box<dyn VfsFile>, OpenFlags)>;

    /// Remove a file.
    fn delete(&self, name: &str, sync_dir: bool) -> Result<()>;

    /// Answer an access question about a file.
    fn access(&self, name: &str, flags: AccessFlags) -> Result<bool>;

    /// Resolve a name to the canonical path the backend stores it under.
    fn full_pathname(&self, name: &str) -> Result<String>;

    // ------------------------------------------------------------------------
    // Dynamic loading
    // ------------------------------------------------------------------------

    fn dl_open(&self, _path: &str) -> Option<LibraryHandle> {
        None
    }

    fn dl_error(&self) -> Option<String> {
        Some("dynamic loading not supported".to_string())
    }

    fn dl_sym(&self, _handle: LibraryHandle, _symbol: &str) -> Option<SymbolAddr> {
        None
    }

    fn dl_close(&self, _handle: LibraryHandle) {}

    // ------------------------------------------------------------------------
    // Randomness, sleep, time
    // ------------------------------------------------------------------------

    /// Fill `buf` with random bytes. Returns the number of bytes written.
    fn randomness(&self, buf: &mut [u8]) -> usize {
        use rand::RngCore;

        rand::thread_rng().fill_bytes(buf);
        buf.len()
    }

    /// Sleep for at least `duration`. Returns the time actually requested.
    fn sleep(&self, duration: Duration) -> Duration {
        std::thread::sleep(duration);
        duration
    }

    /// Current time as milliseconds since the Julian day epoch.
    fn current_time_millis(&self) -> i64 {
        let since_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        UNIX_EPOCH_JULIAN_MS + since_unix
    }

    /// Current time as a fractional Julian day number.
    fn current_time(&self) -> f64 {
        self.current_time_millis() as f64 / 86_400_000.0
    }

    /// Most recent OS-level error, if the backend records one.
    fn last_error(&self) -> Option<String> {
        None
    }

    // ------------------------------------------------------------------------
    // System call hooks
    // ------------------------------------------------------------------------

    fn set_system_call(&self, name: &str, _addr: Option<SymbolAddr>) -> Result<()> {
        Err(Error::NotFound(format!("system call '{}'", name)))
    }

    fn get_system_call(&self, _name: &str) -> Option<SymbolAddr> {
        None
    }

    fn next_system_call(&self, _name: Option<&str>) -> Option<String> {
        None
    }
}

/// Operations on one open file.
///
/// A handle moves from opened to closed exactly once: [`close`](VfsFile::close)
/// consumes it.
pub trait VfsFile: Send {
    /// Close the file, releasing the handle.
    fn close(self: Box<Self>) -> Result<()>;

    /// Fill `buf` from `offset`.
    ///
    /// # Errors
    /// `Error::ShortRead` if the file ends first; the missing tail of
    /// `buf` is zero-filled.
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()>;

    /// Write all of `buf` at `offset`, extending the file if needed.
    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()>;

    /// Set the file length to `size`.
    fn truncate(&mut self, size: u64) -> Result<()>;

    fn sync(&mut self, flags: SyncFlags) -> Result<()>;

    /// Current length in bytes.
    fn file_size(&self) -> Result<u64>;

    fn lock(&mut self, level: LockLevel) -> Result<()>;

    fn unlock(&mut self, level: LockLevel) -> Result<()>;

    /// Whether any handle holds a reserved (or stronger) lock.
    fn check_reserved_lock(&self) -> Result<bool>;

    /// Backend-specific control operation.
    fn file_control(&mut self, op: i32, _arg: &mut dyn Any) -> Result<()> {
        Err(Error::NotFound(format!("file control {}", op)))
    }

    fn sector_size(&self) -> u32 {
        4096
    }

    fn device_characteristics(&self) -> DeviceCharacteristics {
        DeviceCharacteristics::default()
    }
}
