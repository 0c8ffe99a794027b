//! OS-backed storage - `std::fs` files under a root directory.
//!
//! [`OsVfs`] handles all direct file operations for names resolved under its
//! root:
//! - Opening, creating and deleting files
//! - Positioned reads and writes
//! - Truncation and durability (`fsync`)

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{Error, Result};
use crate::vfs::{
    AccessFlags, DeviceCharacteristics, LockLevel, OpenFlags, SyncFlags, Vfs, VfsFile,
};

/// Backend over the host filesystem, registered as `"os"`.
///
/// Every name is interpreted relative to `root`; a single leading `/` is
/// ignored so `"/db.sqlite"` and `"db.sqlite"` resolve to the same file.
///
/// # Thread Safety
/// Each [`VfsFile`] handle owns its own `File`. Locks are advisory and only
/// visible to handles opened through the same `OsVfs`; other processes do
/// not see them.
pub struct OsVfs {
    root: PathBuf,
    /// Per path: handles holding `Reserved` or stronger.
    reserved: Arc<Mutex<HashMap<PathBuf, Arc<AtomicU32>>>>,
}

impl OsVfs {
    /// Create a backend rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            reserved: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Shared reserved-lock counter for `path`.
    fn reserved_counter(&self, path: &Path) -> Arc<AtomicU32> {
        Arc::clone(self.reserved.lock().entry(path.to_path_buf()).or_default())
    }

    /// The directory names are resolved under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name.strip_prefix('/').unwrap_or(name))
    }
}

impl Vfs for OsVfs {
    fn name(&self) -> &str {
        "os"
    }

    fn open(&self, name: Option<&str>, flags: OpenFlags) -> Result<(Box<dyn VfsFile>, OpenFlags)> {
        let read_only = flags.contains(OpenFlags::READONLY);

        let (file, path) = match name {
            Some(name) => {
                let path = self.resolve(name);
                let mut options = OpenOptions::new();
                options.read(true).write(!read_only);

                if flags.contains(OpenFlags::CREATE | OpenFlags::EXCLUSIVE) {
                    options.create_new(true);
                } else if flags.contains(OpenFlags::CREATE) {
                    options.create(true);
                }

                let file = options.open(&path).map_err(|e| match e.kind() {
                    ErrorKind::NotFound | ErrorKind::AlreadyExists => {
                        Error::CantOpen(path.display().to_string())
                    }
                    _ => Error::Io(e),
                })?;
                (file, Some(path))
            }
            None => (tempfile::tempfile()?, None),
        };

        let delete_on_close = flags.contains(OpenFlags::DELETE_ON_CLOSE);
        let out_flags = if read_only {
            flags.without(OpenFlags::READWRITE)
        } else {
            flags
        };

        // Anonymous files cannot be opened twice, so a private counter will do.
        let reserved_holders = match &path {
            Some(path) => self.reserved_counter(path),
            None => Arc::new(AtomicU32::new(0)),
        };

        let file = OsFile {
            file,
            path,
            delete_on_close,
            lock: LockLevel::None,
            reserved_holders,
        };
        Ok((Box::new(file), out_flags))
    }

    fn delete(&self, name: &str, sync_dir: bool) -> Result<()> {
        let path = self.resolve(name);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::DeleteNoent(path.display().to_string()))
            }
            Err(e) => return Err(Error::Io(e)),
        }

        if sync_dir {
            if let Some(parent) = path.parent() {
                // Directory fsync is not available everywhere; best effort.
                if let Ok(dir) = File::open(parent) {
                    let _ = dir.sync_all();
                }
            }
        }
        Ok(())
    }

    fn access(&self, name: &str, flags: AccessFlags) -> Result<bool> {
        let path = self.resolve(name);
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::Io(e)),
        };

        Ok(match flags {
            AccessFlags::Exists | AccessFlags::Read => true,
            AccessFlags::ReadWrite => !metadata.permissions().readonly(),
        })
    }

    fn full_pathname(&self, name: &str) -> Result<String> {
        let path = self.resolve(name).display().to_string();
        if path.len() > self.max_pathname() {
            return Err(Error::CantOpen(path));
        }
        Ok(path)
    }

    fn last_error(&self) -> Option<String> {
        let err = std::io::Error::last_os_error();
        err.raw_os_error().filter(|&code| code != 0).map(|_| err.to_string())
    }
}

/// Handle to an OS file.
struct OsFile {
    file: File,
    path: Option<PathBuf>,
    delete_on_close: bool,
    lock: LockLevel,
    reserved_holders: Arc<AtomicU32>,
}

impl OsFile {
    fn set_lock(&mut self, level: LockLevel) {
        let was_reserved = self.lock >= LockLevel::Reserved;
        let is_reserved = level >= LockLevel::Reserved;
        if is_reserved && !was_reserved {
            self.reserved_holders.fetch_add(1, Ordering::Relaxed);
        } else if was_reserved && !is_reserved {
            self.reserved_holders.fetch_sub(1, Ordering::Relaxed);
        }
        self.lock = level;
    }
}

impl Drop for OsFile {
    fn drop(&mut self) {
        self.set_lock(LockLevel::None);
        if self.delete_on_close {
            if let Some(path) = self.path.take() {
                let _ = fs::remove_file(path);
            }
        }
    }
}

impl VfsFile for OsFile {
    fn close(mut self: Box<Self>) -> Result<()> {
        self.set_lock(LockLevel::None);
        if self.delete_on_close {
            // Taken here so the error surfaces; `Drop` then has nothing to do.
            if let Some(path) = self.path.take() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;

        let mut got = 0;
        while got < buf.len() {
            match self.file.read(&mut buf[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        if got < buf.len() {
            buf[got..].fill(0);
            return Err(Error::ShortRead {
                wanted: buf.len(),
                got,
            });
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        self.file.set_len(size)?;
        Ok(())
    }

    fn sync(&mut self, flags: SyncFlags) -> Result<()> {
        if flags.data_only() {
            self.file.sync_data()?;
        } else {
            self.file.sync_all()?;
        }
        Ok(())
    }

    fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn lock(&mut self, level: LockLevel) -> Result<()> {
        if level > self.lock {
            self.set_lock(level);
        }
        Ok(())
    }

    fn unlock(&mut self, level: LockLevel) -> Result<()> {
        if level < self.lock {
            self.set_lock(level);
        }
        Ok(())
    }

    fn check_reserved_lock(&self) -> Result<bool> {
        Ok(self.reserved_holders.load(Ordering::Relaxed) > 0)
    }

    fn device_characteristics(&self) -> DeviceCharacteristics {
        DeviceCharacteristics::POWERSAFE_OVERWRITE
    }
}
