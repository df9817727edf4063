//! Error types for diskwire
//!
//! Provides a unified error type for all transfer operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using DiskwireError
pub type Result<T> = std::result::Result<T, DiskwireError>;

/// Unified error type for diskwire operations
#[derive(Debug, Error)]
pub enum DiskwireError {
    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    /// The daemon could not be reached, or the stream failed mid-exchange.
    /// Never retried automatically.
    #[error("Connection error: {0}")]
    Connection(#[source] std::io::Error),

    #[error("Timed out waiting on peer during {0}")]
    Timeout(&'static str),

    // -------------------------------------------------------------------------
    // Framing Errors (fatal to the connection)
    // -------------------------------------------------------------------------
    #[error("Short read: expected {expected} bytes, peer closed after {received}")]
    ShortRead { expected: u64, received: u64 },

    #[error("Short write: expected {expected} bytes, stream accepted {written}")]
    ShortWrite { expected: u64, written: u64 },

    #[error("Value {value} does not fit in a {width}-byte field")]
    Overflow { value: u64, width: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Filename / Local Storage Errors
    // -------------------------------------------------------------------------
    #[error("Rejected filename {0:?}: escapes the storage directory")]
    PathTraversal(String),

    #[error("Invalid filename {name:?}: {reason}")]
    InvalidFilename { name: String, reason: &'static str },

    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DiskwireError {
    /// Classify an I/O error raised by a socket operation.
    ///
    /// Read/write deadlines surface as `WouldBlock` on Unix and `TimedOut`
    /// on Windows; everything else means the stream is unusable.
    pub fn from_socket(err: std::io::Error, during: &'static str) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                DiskwireError::Timeout(during)
            }
            _ => DiskwireError::Connection(err),
        }
    }
}
