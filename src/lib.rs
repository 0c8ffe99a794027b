//! trackvfs - dirty-page tracking for database files.
//!
//! A storage decorator that sits between a database engine and its real
//! file backend, forwards every operation untouched, and records which
//! pages each write or truncate touched. A sync layer can then copy only
//! the changed pages instead of the whole file.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Database engine                          │
//! └─────────────────────────────────────────────────────────────────┘
//!                               ↓  (default backend)
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 TrackingVfs / TrackingFile (tracking/)          │
//! │      forward first ──▶ on success: Tracker::mark_dirty()        │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │  TrackingRegistry: filename → Tracker { DirtyBitmap }    │   │
//! │  │  get_dirty_pages() / reset_dirty()  ◀── sync layer       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              Real backend (vfs/): MemVfs | OsVfs                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, StatusCode, config)
//! - [`vfs`] - Backend interface, discovery and real backends
//! - [`tracking`] - Dirty bitmap, trackers, registry and the decorator
//! - [`api`] - Process-wide exported operations
//!
//! # Quick Start
//! ```
//! use std::sync::Arc;
//! use trackvfs::tracking::TrackingRegistry;
//! use trackvfs::vfs::{OpenFlags, VfsRegistry};
//! use trackvfs::PageId;
//!
//! let host = Arc::new(VfsRegistry::with_builtin());
//! let registry = TrackingRegistry::new(Arc::clone(&host));
//! registry.initialize("memfs", 4096).unwrap();
//!
//! let vfs = host.default_vfs().unwrap();
//! let (mut file, _) = vfs
//!     .open(Some("app.db"), OpenFlags::READWRITE | OpenFlags::CREATE)
//!     .unwrap();
//! file.write(&[0u8; 20], 4090).unwrap();
//!
//! let dirty = registry.get_dirty_pages("app.db").unwrap();
//! assert_eq!(dirty, vec![PageId::new(0), PageId::new(1)]);
//! registry.reset_dirty("app.db").unwrap();
//! ```

pub mod api;
pub mod common;
pub mod tracking;
pub mod vfs;

// Re-export commonly used items at crate root for convenience
pub use common::config::DEFAULT_PAGE_SIZE;
pub use common::{Error, PageId, Result, StatusCode};

pub use tracking::{DirtyBitmap, Tracker, TrackingRegistry, TrackingVfs};
pub use vfs::{MemVfs, OsVfs, Vfs, VfsFile, VfsRegistry};
