//! Error types for trackvfs.

use std::fmt;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in trackvfs.
///
/// Backends return these from every operation. The tracking decorator
/// passes them through untouched, so a caller sees exactly what the
/// wrapped backend reported.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from an OS-backed file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A named backend, file or hook does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The backend refused to open a file.
    #[error("unable to open {0}")]
    CantOpen(String),

    /// A read ran past end of file. The unread tail was zero-filled.
    #[error("short read: wanted {wanted} bytes, got {got}")]
    ShortRead { wanted: usize, got: usize },

    /// Deleting a file that does not exist.
    #[error("cannot delete {0}: no such file")]
    DeleteNoent(String),

    /// A backend could not be registered with the host.
    #[error("registration failed: {0}")]
    Registration(String),

    /// A filename was empty where one is required.
    #[error("invalid filename")]
    InvalidFilename,

    /// Storage for tracking state could not be allocated.
    #[error("out of memory")]
    OutOfMemory,

    /// A byte range maps to a page index past `u32::MAX`.
    #[error("page {0} out of range")]
    PageOutOfRange(u64),

    /// The backend does not implement this operation.
    #[error("{0} not supported")]
    Unsupported(&'static str),
}

impl Error {
    /// Map this error onto its SQLite-compatible status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Io(_) => StatusCode::IoErr,
            Error::NotFound(_) => StatusCode::NotFound,
            Error::CantOpen(_) => StatusCode::CantOpen,
            Error::ShortRead { .. } => StatusCode::IoErrShortRead,
            Error::DeleteNoent(_) => StatusCode::IoErrDeleteNoent,
            Error::Registration(_) | Error::InvalidFilename | Error::Unsupported(_) => {
                StatusCode::Error
            }
            Error::OutOfMemory | Error::PageOutOfRange(_) => StatusCode::NoMem,
        }
    }
}

/// Result codes crossing the exported boundary.
///
/// Values match SQLite's primary and extended result codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok = 0,
    Error = 1,
    NoMem = 7,
    IoErr = 10,
    NotFound = 12,
    CantOpen = 14,
    IoErrShortRead = 522,
    IoErrDeleteNoent = 5898,
}

impl StatusCode {
    /// Collapse a `Result` into a status code.
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => StatusCode::Ok,
            Err(e) => e.status_code(),
        }
    }

    /// Whether this code reports success.
    #[inline]
    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }

    /// The raw integer code.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}
