//! End-to-end tracking through the host's default backend.
//!
//! These tests drive the decorator the way a database engine would: look
//! up the default backend, open, write, truncate, close, reopen.

use std::sync::Arc;

use tempfile::tempdir;
use trackvfs::tracking::TrackingRegistry;
use trackvfs::vfs::{OpenFlags, OsVfs, Vfs, VfsRegistry};
use trackvfs::PageId;

const PAGE_SIZE: u32 = 4096;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup(base: &str) -> (Arc<VfsRegistry>, TrackingRegistry) {
    init_tracing();
    let host = Arc::new(VfsRegistry::with_builtin());
    let registry = TrackingRegistry::new(Arc::clone(&host));
    registry.initialize(base, PAGE_SIZE).unwrap();
    (host, registry)
}

fn rw_create() -> OpenFlags {
    OpenFlags::READWRITE | OpenFlags::CREATE | OpenFlags::MAIN_DB
}

fn dirty(registry: &TrackingRegistry, name: &str) -> Vec<u32> {
    registry
        .get_dirty_pages(name)
        .unwrap()
        .into_iter()
        .map(u32::from)
        .collect()
}

/// Write, span a boundary, reset, reopen.
#[test]
fn test_sync_cycle_scenario() {
    let (host, registry) = setup("memfs");
    let vfs = host.default_vfs().unwrap();
    assert_eq!(vfs.name(), "tracking");

    let (mut file, _) = vfs.open(Some("/app.db"), rw_create()).unwrap();

    file.write(&[1u8; 10], 0).unwrap();
    assert_eq!(dirty(&registry, "app.db"), vec![0]);

    file.write(&[2u8; 20], 4090).unwrap();
    assert_eq!(dirty(&registry, "app.db"), vec![0, 1]);

    registry.reset_dirty("app.db").unwrap();
    assert!(dirty(&registry, "app.db").is_empty());

    file.close().unwrap();
    assert!(!registry.tracker("app.db").unwrap().is_open);

    let (file, _) = vfs.open(Some("app.db"), OpenFlags::READWRITE).unwrap();
    assert!(registry.tracker("app.db").unwrap().is_open);
    assert!(dirty(&registry, "app.db").is_empty());
    assert_eq!(registry.tracker("app.db").unwrap().total_pages, 2);
    file.close().unwrap();
}

/// Dirty state accumulates across open/close cycles until reset.
#[test]
fn test_dirty_state_survives_close() {
    let (host, registry) = setup("memfs");
    let vfs = host.default_vfs().unwrap();

    {
        let (mut file, _) = vfs.open(Some("app.db"), rw_create()).unwrap();
        file.write(&[0u8; 4096], 0).unwrap();
        file.close().unwrap();
    }
    {
        let (mut file, _) = vfs.open(Some("/app.db"), rw_create()).unwrap();
        file.write(&[0u8; 4096], 3 * 4096).unwrap();
        file.close().unwrap();
    }

    assert_eq!(dirty(&registry, "/app.db"), vec![0, 3]);
    assert_eq!(registry.tracker_count(), 1);
}

/// Files are tracked independently.
#[test]
fn test_files_tracked_separately() {
    let (host, registry) = setup("memfs");
    let vfs = host.default_vfs().unwrap();

    let (mut db, _) = vfs.open(Some("app.db"), rw_create()).unwrap();
    let journal_flags = rw_create() | OpenFlags::MAIN_JOURNAL;
    let (mut journal, _) = vfs.open(Some("app.db-journal"), journal_flags).unwrap();

    db.write(&[0u8; 512], 8192).unwrap();
    journal.write(&[0u8; 512], 0).unwrap();

    assert_eq!(dirty(&registry, "app.db"), vec![2]);
    assert_eq!(dirty(&registry, "app.db-journal"), vec![0]);

    registry.reset_dirty("app.db-journal").unwrap();
    assert_eq!(dirty(&registry, "app.db"), vec![2]);
}

/// Temp files opened without a name never create trackers.
#[test]
fn test_anonymous_temp_files() {
    let (host, registry) = setup("memfs");
    let vfs = host.default_vfs().unwrap();

    let flags = rw_create() | OpenFlags::DELETE_ON_CLOSE | OpenFlags::TEMP_DB;
    let (mut temp, _) = vfs.open(None, flags).unwrap();
    temp.write(&[9u8; 8192], 0).unwrap();
    temp.close().unwrap();

    assert_eq!(registry.tracker_count(), 0);
    assert_eq!(registry.stats().snapshot().untracked_writes, 1);
}

/// Shrinking the file flags only the page at the new end.
#[test]
fn test_truncate_heuristic() {
    let (host, registry) = setup("memfs");
    let vfs = host.default_vfs().unwrap();
    let (mut file, _) = vfs.open(Some("app.db"), rw_create()).unwrap();

    file.write(&[0u8; 10 * 4096], 0).unwrap();
    registry.reset_dirty("app.db").unwrap();

    file.truncate(5 * 4096).unwrap();

    assert_eq!(dirty(&registry, "app.db"), vec![5]);
    // Page count never shrinks.
    assert_eq!(registry.tracker("app.db").unwrap().total_pages, 10);
}

/// Growth far past the current end keeps earlier bits.
#[test]
fn test_growth_preserves_earlier_pages() {
    let (host, registry) = setup("memfs");
    let vfs = host.default_vfs().unwrap();
    let (mut file, _) = vfs.open(Some("app.db"), rw_create()).unwrap();

    file.write(&[1u8; 1], 0).unwrap();
    file.write(&[1u8; 1], 500 * 4096).unwrap();

    let pages = registry.get_dirty_pages("app.db").unwrap();
    assert_eq!(pages, vec![PageId::new(0), PageId::new(500)]);
    assert!(registry.stats().snapshot().bitmap_growths >= 2);
}

/// Data written through the decorator is what the backend stores.
#[test]
fn test_transparent_over_os_backend() {
    init_tracing();
    let dir = tempdir().unwrap();
    let host = Arc::new(VfsRegistry::new());
    host.register(Arc::new(OsVfs::new(dir.path())) as Arc<dyn Vfs>, true)
        .unwrap();
    let registry = TrackingRegistry::new(Arc::clone(&host));
    registry.initialize("os", 1024).unwrap();

    let vfs = host.default_vfs().unwrap();
    let (mut file, _) = vfs.open(Some("/data.db"), rw_create()).unwrap();
    file.write(b"hello tracked world", 1010).unwrap();

    let mut buf = [0u8; 19];
    file.read(&mut buf, 1010).unwrap();
    assert_eq!(&buf, b"hello tracked world");
    assert_eq!(file.file_size().unwrap(), 1029);
    file.close().unwrap();

    // 1010..1029 spans the 1024-byte boundary.
    assert_eq!(dirty(&registry, "data.db"), vec![0, 1]);
    assert_eq!(std::fs::read(dir.path().join("data.db")).unwrap().len(), 1029);

    registry.shutdown();
    assert!(host.default_vfs().is_some_and(|v| v.name() == "os"));
}

/// After shutdown, handles still work but nothing is tracked.
#[test]
fn test_shutdown_detaches_open_handles() {
    let (host, registry) = setup("memfs");
    let vfs = host.default_vfs().unwrap();
    let (mut file, _) = vfs.open(Some("app.db"), rw_create()).unwrap();
    file.write(&[0u8; 10], 0).unwrap();

    registry.shutdown();

    file.write(&[0u8; 10], 4096).unwrap();
    file.close().unwrap();
    assert!(dirty(&registry, "app.db").is_empty());
    assert_eq!(host.default_vfs().unwrap().name(), "memfs");
}

/// A handle dropped without `close` still leaves the tracker closed.
#[test]
fn test_dropped_handle_marks_tracker_closed() {
    let (host, registry) = setup("memfs");
    let vfs = host.default_vfs().unwrap();

    {
        let (mut file, _) = vfs.open(Some("a.db"), rw_create()).unwrap();
        file.write(&[3u8; 64], 0).unwrap();
        assert!(registry.tracker("a.db").unwrap().is_open);
    }

    let info = registry.tracker("a.db").unwrap();
    assert!(!info.is_open);
    assert_eq!(info.dirty_count, 1);
}
