//! Filename validation
//!
//! The single gate every name passes before it touches a socket or a disk.
//! A `Filename` is a bare ASCII file name: joining it onto a directory can
//! never leave that directory.

use std::fmt;

use crate::error::{DiskwireError, Result};

/// Longest accepted filename (bytes)
pub const MAX_FILENAME_LEN: usize = 255;

/// A validated, single-component ASCII filename
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filename(String);

impl Filename {
    /// Validate a user- or peer-supplied name
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(invalid(name, "empty name"));
        }
        if name.len() > MAX_FILENAME_LEN {
            return Err(invalid(name, "name too long"));
        }
        if !name.is_ascii() {
            return Err(invalid(name, "name must be ASCII"));
        }
        if name.bytes().any(|b| b.is_ascii_control()) {
            return Err(invalid(name, "name contains control characters"));
        }

        // Separators, drive prefixes and dot segments all let a join escape
        if name == "." || name == ".." || name.contains(['/', '\\', ':']) {
            return Err(DiskwireError::PathTraversal(name.to_string()));
        }

        Ok(Self(name.to_string()))
    }

    /// Validate a name received off the wire
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match std::str::from_utf8(bytes) {
            Ok(name) => Self::parse(name),
            Err(_) => Err(invalid(
                &String::from_utf8_lossy(bytes),
                "name must be ASCII",
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Filename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Filename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn invalid(name: &str, reason: &'static str) -> DiskwireError {
    DiskwireError::InvalidFilename {
        name: name.to_string(),
        reason,
    }
}
