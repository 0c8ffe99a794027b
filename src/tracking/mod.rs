//! Dirty-page tracking.
//!
//! Records, at page granularity, which regions of each file changed since
//! the last reset, so a sync layer can copy only those pages.
//!
//! # Components
//! - [`DirtyBitmap`] - Growable bit-per-page set
//! - [`Tracker`] - Per-filename page size, page count and bitmap
//! - [`TrackingRegistry`] - Tracker lookup plus install/uninstall lifecycle
//! - [`TrackingVfs`] - The decorator that observes writes and truncates
//! - [`TrackingStats`] - Diagnostic counters

mod bitmap;
mod decorator;
mod registry;
mod stats;
mod tracker;

pub use bitmap::DirtyBitmap;
pub use decorator::TrackingVfs;
pub use registry::{normalize_filename, TrackerRef, TrackerTable, TrackingRegistry};
pub use stats::{StatsSnapshot, TrackingStats};
pub use tracker::{Tracker, TrackerInfo};
