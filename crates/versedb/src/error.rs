//! Error types for versedb

use std::fmt;
use std::io;

/// Result type alias for versedb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for storage operations
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(io::Error),

    /// Malformed log file or record
    Parse(String),

    /// Prefs snapshot could not be encoded or decoded
    Json(serde_json::Error),

    /// Key longer than the engine accepts
    KeyTooLarge(usize),

    /// Value larger than the engine accepts
    ValueTooLarge(usize),

    /// Log file reached its size limit
    StoreFull(u64),

    /// Store has been closed
    Closed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::Json(e) => write!(f, "JSON error: {}", e),
            Error::KeyTooLarge(size) => write!(f, "Key too large: {} bytes", size),
            Error::ValueTooLarge(size) => write!(f, "Value too large: {} bytes", size),
            Error::StoreFull(size) => write!(f, "Store full: {} bytes (max 1 GB)", size),
            Error::Closed => write!(f, "Store is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        Error::Parse(format!("{:?}", err))
    }
}
