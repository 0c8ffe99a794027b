//! Common types and utilities shared across trackvfs.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`TrackingConfig`](config::TrackingConfig)
//! - Error types and status codes
//! - Page identifiers

pub mod config;
pub mod error;
mod page_id;

pub use error::{Error, Result, StatusCode};
pub use page_id::PageId;
