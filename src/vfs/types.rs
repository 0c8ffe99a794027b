//! Flag and level types shared by every backend.
//!
//! Bit values match SQLite's so a binding layer can pass them straight
//! through.

use std::ops::{BitOr, BitOrAssign};

/// Flags passed to [`Vfs::open`](super::Vfs::open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpenFlags(pub u32);

impl OpenFlags {
    pub const READONLY: OpenFlags = OpenFlags(0x0000_0001);
    pub const READWRITE: OpenFlags = OpenFlags(0x0000_0002);
    pub const CREATE: OpenFlags = OpenFlags(0x0000_0004);
    pub const DELETE_ON_CLOSE: OpenFlags = OpenFlags(0x0000_0008);
    pub const EXCLUSIVE: OpenFlags = OpenFlags(0x0000_0010);
    pub const MAIN_DB: OpenFlags = OpenFlags(0x0000_0100);
    pub const TEMP_DB: OpenFlags = OpenFlags(0x0000_0200);
    pub const MAIN_JOURNAL: OpenFlags = OpenFlags(0x0000_0800);
    pub const TEMP_JOURNAL: OpenFlags = OpenFlags(0x0000_1000);
    pub const WAL: OpenFlags = OpenFlags(0x0008_0000);

    /// Whether every bit of `other` is set.
    #[inline]
    pub fn contains(self, other: OpenFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// The flags with `other` cleared.
    #[inline]
    pub fn without(self, other: OpenFlags) -> OpenFlags {
        OpenFlags(self.0 & !other.0)
    }
}

impl BitOr for OpenFlags {
    type Output = OpenFlags;

    fn bitor(self, rhs: OpenFlags) -> OpenFlags {
        OpenFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: OpenFlags) {
        self.0 |= rhs.0;
    }
}

/// Question asked by [`Vfs::access`](super::Vfs::access).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFlags {
    /// Does the file exist?
    Exists = 0,
    /// Is it readable and writable?
    ReadWrite = 1,
    /// Is it readable?
    Read = 2,
}

/// Durability requested by [`VfsFile::sync`](super::VfsFile::sync).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SyncFlags(pub u32);

impl SyncFlags {
    pub const NORMAL: SyncFlags = SyncFlags(0x02);
    pub const FULL: SyncFlags = SyncFlags(0x03);
    pub const DATA_ONLY: SyncFlags = SyncFlags(0x10);

    /// Whether only file contents (not metadata) must be made durable.
    #[inline]
    pub fn data_only(self) -> bool {
        self.0 & Self::DATA_ONLY.0 != 0
    }
}

/// File lock levels, weakest first.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockLevel {
    #[default]
    None = 0,
    Shared = 1,
    Reserved = 2,
    Pending = 3,
    Exclusive = 4,
}

/// Properties a backend advertises about its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceCharacteristics(pub u32);

impl DeviceCharacteristics {
    pub const ATOMIC: DeviceCharacteristics = DeviceCharacteristics(0x0000_0001);
    pub const SAFE_APPEND: DeviceCharacteristics = DeviceCharacteristics(0x0000_0200);
    pub const SEQUENTIAL: DeviceCharacteristics = DeviceCharacteristics(0x0000_0400);
    pub const POWERSAFE_OVERWRITE: DeviceCharacteristics = DeviceCharacteristics(0x0000_1000);

    /// Whether every bit of `other` is set.
    #[inline]
    pub fn contains(self, other: DeviceCharacteristics) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DeviceCharacteristics {
    type Output = DeviceCharacteristics;

    fn bitor(self, rhs: DeviceCharacteristics) -> DeviceCharacteristics {
        DeviceCharacteristics(self.0 | rhs.0)
    }
}

/// Opaque handle to a dynamically loaded library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LibraryHandle(pub usize);

/// Opaque address of a symbol or system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolAddr(pub usize);
