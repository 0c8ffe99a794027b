//! In-memory backend.
//!
//! [`MemVfs`] keeps every named file in a map from path to buffer. Files
//! outlive their handles and are only dropped by [`Vfs::delete`] (or on
//! close when opened with `DELETE_ON_CLOSE`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::common::{Error, Result};
use crate::vfs::{
    AccessFlags, DeviceCharacteristics, LockLevel, OpenFlags, SyncFlags, Vfs, VfsFile,
};

/// Sector size reported for in-memory files.
const MEM_SECTOR_SIZE: u32 = 512;

/// Backing storage for one in-memory file.
#[derive(Default)]
struct MemNode {
    data: RwLock<Vec<u8>>,
    /// Handles currently holding `Reserved` or stronger.
    reserved_holders: AtomicU32,
}

/// In-memory filesystem registered as `"memfs"`.
///
/// # Example
/// ```
/// use trackvfs::vfs::{MemVfs, OpenFlags, Vfs};
///
/// let vfs = MemVfs::new();
/// let flags = OpenFlags::READWRITE | OpenFlags::CREATE;
/// let (mut file, _) = vfs.open(Some("test.db"), flags).unwrap();
/// file.write(b"hello", 0).unwrap();
/// assert_eq!(file.file_size().unwrap(), 5);
/// file.close().unwrap();
/// ```
pub struct MemVfs {
    name: String,
    files: Arc<Mutex<HashMap<String, Arc<MemNode>>>>,
}

impl MemVfs {
    /// Create an empty in-memory filesystem named `"memfs"`.
    pub fn new() -> Self {
        Self::with_name("memfs")
    }

    /// Create an empty in-memory filesystem with a custom name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of named files currently stored.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Copy of a named file's contents.
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        let key = canonical(name);
        self.files.lock().get(&key).map(|node| node.data.read().clone())
    }
}

impl Default for MemVfs {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical key for a name: always rooted at `/`.
fn canonical(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{}", name)
    }
}

impl Vfs for MemVfs {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, name: Option<&str>, flags: OpenFlags) -> Result<(Box<dyn VfsFile>, OpenFlags)> {
        let (node, path) = match name {
            Some(name) => {
                let key = canonical(name);
                let mut files = self.files.lock();
                let node = match files.get(&key) {
                    Some(node) => {
                        if flags.contains(OpenFlags::CREATE | OpenFlags::EXCLUSIVE) {
                            return Err(Error::CantOpen(key));
                        }
                        Arc::clone(node)
                    }
                    None => {
                        if !flags.contains(OpenFlags::CREATE) {
                            return Err(Error::CantOpen(key));
                        }
                        let node = Arc::new(MemNode::default());
                        files.insert(key.clone(), Arc::clone(&node));
                        node
                    }
                };
                (node, Some(key))
            }
            // Anonymous files live only as long as their handle.
            None => (Arc::new(MemNode::default()), None),
        };

        let file = MemFile {
            node,
            path,
            files: Arc::clone(&self.files),
            delete_on_close: flags.contains(OpenFlags::DELETE_ON_CLOSE),
            read_only: flags.contains(OpenFlags::READONLY),
            lock: LockLevel::None,
        };
        Ok((Box::new(file), flags))
    }

    fn delete(&self, name: &str, _sync_dir: bool) -> Result<()> {
        let key = canonical(name);
        match self.files.lock().remove(&key) {
            Some(_) => Ok(()),
            None => Err(Error::DeleteNoent(key)),
        }
    }

    fn access(&self, name: &str, _flags: AccessFlags) -> Result<bool> {
        // Every in-memory file is readable and writable.
        Ok(self.files.lock().contains_key(&canonical(name)))
    }

    fn full_pathname(&self, name: &str) -> Result<String> {
        let path = canonical(name);
        if path.len() > self.max_pathname() {
            return Err(Error::CantOpen(path));
        }
        Ok(path)
    }
}

/// Handle to an in-memory file.
struct MemFile {
    node: Arc<MemNode>,
    path: Option<String>,
    files: Arc<Mutex<HashMap<String, Arc<MemNode>>>>,
    delete_on_close: bool,
    read_only: bool,
    lock: LockLevel,
}

impl Drop for MemFile {
    fn drop(&mut self) {
        if self.lock >= LockLevel::Reserved {
            self.node.reserved_holders.fetch_sub(1, Ordering::Relaxed);
        }
        self.lock = LockLevel::None;

        if self.delete_on_close {
            if let Some(path) = &self.path {
                let mut files = self.files.lock();
                // Only remove the entry if it still refers to our node.
                if files.get(path).is_some_and(|n| Arc::ptr_eq(n, &self.node)) {
                    files.remove(path);
                }
            }
        }
    }
}

impl VfsFile for MemFile {
    /// Locks and delete-on-close are released by `Drop`.
    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        let data = self.node.data.read();
        let len = data.len() as u64;

        let available = if offset >= len {
            0
        } else {
            ((len - offset) as usize).min(buf.len())
        };

        if available > 0 {
            let start = offset as usize;
            buf[..available].copy_from_slice(&data[start..start + available]);
        }

        if available < buf.len() {
            buf[available..].fill(0);
            return Err(Error::ShortRead {
                wanted: buf.len(),
                got: available,
            });
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        if self.read_only {
            return Err(Error::Unsupported("write on read-only file"));
        }
        let start = usize::try_from(offset).map_err(|_| Error::OutOfMemory)?;
        let end = start.checked_add(buf.len()).ok_or(Error::OutOfMemory)?;

        let mut data = self.node.data.write();
        let len = data.len();
        if end > len {
            data.try_reserve(end - len).map_err(|_| Error::OutOfMemory)?;
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        let size = usize::try_from(size).map_err(|_| Error::OutOfMemory)?;
        let mut data = self.node.data.write();
        let len = data.len();
        if size > len {
            data.try_reserve(size - len).map_err(|_| Error::OutOfMemory)?;
        }
        data.resize(size, 0);
        Ok(())
    }

    fn sync(&mut self, _flags: SyncFlags) -> Result<()> {
        Ok(())
    }

    fn file_size(&self) -> Result<u64> {
        Ok(self.node.data.read().len() as u64)
    }

    fn lock(&mut self, level: LockLevel) -> Result<()> {
        if level <= self.lock {
            return Ok(());
        }
        if level >= LockLevel::Reserved && self.lock < LockLevel::Reserved {
            self.node.reserved_holders.fetch_add(1, Ordering::Relaxed);
        }
        self.lock = level;
        Ok(())
    }

    fn unlock(&mut self, level: LockLevel) -> Result<()> {
        if level >= self.lock {
            return Ok(());
        }
        if level < LockLevel::Reserved && self.lock >= LockLevel::Reserved {
            self.node.reserved_holders.fetch_sub(1, Ordering::Relaxed);
        }
        self.lock = level;
        Ok(())
    }

    fn check_reserved_lock(&self) -> Result<bool> {
        Ok(self.node.reserved_holders.load(Ordering::Relaxed) > 0)
    }

    fn sector_size(&self) -> u32 {
        MEM_SECTOR_SIZE
    }

    fn device_characteristics(&self) -> DeviceCharacteristics {
        DeviceCharacteristics::SAFE_APPEND | DeviceCharacteristics::POWERSAFE_OVERWRITE
    }
}
