//! Exported boundary for a binding layer.
//!
//! One canonical host registry and tracking registry live for the whole
//! process. These functions wrap them and speak in [`StatusCode`]s and raw
//! page numbers, so a binding can forward them without knowing Rust types.
//! A filename of `None` stands for a null pointer.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::common::StatusCode;
use crate::tracking::{normalize_filename, TrackingRegistry};
use crate::vfs::{OsVfs, Vfs, VfsRegistry};

static HOST: Lazy<Arc<VfsRegistry>> = Lazy::new(|| {
    let host = VfsRegistry::with_builtin();
    // "os" is not taken in a fresh registry, so this cannot fail.
    let _ = host.register(Arc::new(OsVfs::new(".")) as Arc<dyn Vfs>, false);
    Arc::new(host)
});

static REGISTRY: Lazy<TrackingRegistry> = Lazy::new(|| TrackingRegistry::new(Arc::clone(&HOST)));

/// The process-wide backend registry ("memfs" default, plus "os").
pub fn host() -> &'static Arc<VfsRegistry> {
    &HOST
}

/// The process-wide tracking registry.
pub fn registry() -> &'static TrackingRegistry {
    &REGISTRY
}

/// Wrap `base_vfs` and make the decorator the default backend.
///
/// Returns `Ok` if already initialized, `NotFound` if the base backend does
/// not exist, or the registration failure code.
pub fn tracking_init(base_vfs: &str, page_size: u32) -> StatusCode {
    StatusCode::from_result(&REGISTRY.initialize(base_vfs, page_size))
}

/// Drop all tracking state and uninstall the decorator.
pub fn tracking_shutdown() {
    REGISTRY.shutdown();
}

/// Dirty pages of `filename`, ascending. The page count is the vector length.
///
/// Returns `Error` and no pages for a null filename. A name that is empty
/// after normalization has no tracker: `Ok` with no pages.
pub fn tracking_get_dirty_pages(filename: Option<&str>) -> (StatusCode, Vec<u32>) {
    let Some(filename) = filename else {
        return (StatusCode::Error, Vec::new());
    };
    if normalize_filename(filename).is_empty() {
        return (StatusCode::Ok, Vec::new());
    }

    match REGISTRY.get_dirty_pages(filename) {
        Ok(pages) => (StatusCode::Ok, pages.into_iter().map(u32::from).collect()),
        Err(e) => (e.status_code(), Vec::new()),
    }
}

/// Mark every page of `filename` clean, typically after a successful sync.
///
/// Returns `Error` only for a null filename; an empty name is a no-op.
pub fn tracking_reset_dirty(filename: Option<&str>) -> StatusCode {
    match filename {
        Some(filename) if normalize_filename(filename).is_empty() => StatusCode::Ok,
        Some(filename) => StatusCode::from_result(&REGISTRY.reset_dirty(filename)),
        None => StatusCode::Error,
    }
}
