//! Local listing
//!
//! Directory enumeration and human-readable sizes for the `ls` view.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{DiskwireError, Result};

/// A regular file in a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

/// List regular files in `dir`, sorted by name
pub fn list_files(dir: &Path) -> Result<Vec<FileEntry>> {
    let read_dir = fs::read_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DiskwireError::NotFound(dir.to_path_buf()),
        _ => DiskwireError::Io(e),
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        let metadata = entry.metadata()?;

        if metadata.is_file() {
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
            });
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Size of the file at `path` in bytes
pub fn size_of(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(DiskwireError::NotFound(path.to_path_buf())),
        Err(e) => Err(e.into()),
    }
}

/// Format a byte count as kB / MB / GB with two decimals
///
/// Thresholds are decimal (10^6, 10^9), divisors binary (1024^n).
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let size = bytes as f64;

    if bytes > 1_000_000_000 {
        format!("{:.2} GB", size / (KB * KB * KB))
    } else if bytes > 1_000_000 {
        format!("{:.2} MB", size / (KB * KB))
    } else {
        format!("{:.2} kB", size / KB)
    }
}
