//! File Store
//!
//! The daemon's persistence layer: one file per name under a root directory.
//!
//! ## Responsibilities
//! - Persist uploads atomically (temp file + rename)
//! - At most one writer per filename at a time
//! - Open stored files for GET, remove them for DELETE

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DiskwireError, Result};
use crate::protocol::frame;
use crate::protocol::Filename;

use super::listing::{self, FileEntry};

/// Subdirectory of the root holding in-flight uploads
///
/// A `Filename` cannot contain a separator, so nothing inside it is
/// addressable by clients. The directory name itself is reserved.
pub const STAGING_DIR: &str = ".staging";

/// Daemon-side file storage
///
/// ## Concurrency:
/// - `writers`: one lock per filename currently being written or deleted
/// - Readers take no lock; rename is atomic, so a GET sees either the old
///   or the new file, never a partial one
/// - Partial uploads live under `STAGING_DIR` until renamed into the root
pub struct Store {
    /// Directory files are stored in
    root: PathBuf,

    /// Directory uploads are staged in (same filesystem as `root`)
    staging: PathBuf,

    /// Per-filename writer locks
    writers: Mutex<HashMap<Filename, Arc<Mutex<()>>>>,
}

impl Store {
    /// Open or create a store rooted at `root`
    ///
    /// Leftover staging files from an earlier crash are removed.
    pub fn open(root: &Path) -> Result<Self> {
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging)?;

        let mut stale = 0usize;
        for entry in fs::read_dir(&staging)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                stale += 1;
            }
        }
        if stale > 0 {
            tracing::warn!("Removed {} stale staging file(s) under {:?}", stale, staging);
        }

        Ok(Self {
            root: root.to_path_buf(),
            staging,
            writers: Mutex::new(HashMap::new()),
        })
    }

    /// Receive exactly `len` bytes from `conn` and store them under `name`
    ///
    /// The previous file (if any) is replaced only after the whole payload
    /// arrived; a short read leaves it untouched.
    pub fn put<R: Read + ?Sized>(&self, name: &Filename, conn: &mut R, len: u64) -> Result<u64> {
        check_not_reserved(name)?;
        let lock = self.writer_lock(name);
        let _guard = lock.lock();

        let mut staged = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&self.staging)?;

        let written = {
            let mut sink = BufWriter::new(staged.as_file_mut());
            let written = frame::recv_to(conn, &mut sink, len)?;
            sink.flush()?;
            written
        };
        staged.as_file().sync_all()?;

        staged
            .persist(self.path_of(name))
            .map_err(|e| DiskwireError::Io(e.error))?;

        tracing::debug!("Stored {} ({} bytes)", name, written);
        Ok(written)
    }

    /// Open the file stored under `name` along with its length
    ///
    /// Returns `Ok(None)` if no such file exists.
    pub fn open_file(&self, name: &Filename) -> Result<Option<(File, u64)>> {
        check_not_reserved(name)?;
        match File::open(self.path_of(name)) {
            Ok(file) => {
                let len = file.metadata()?.len();
                Ok(Some((file, len)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the file stored under `name`
    ///
    /// Returns `Ok(false)` if there was nothing to remove.
    pub fn delete(&self, name: &Filename) -> Result<bool> {
        check_not_reserved(name)?;
        let lock = self.writer_lock(name);
        let _guard = lock.lock();

        match fs::remove_file(self.path_of(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List stored files
    ///
    /// Only regular files in the root are listed, so in-flight uploads never
    /// show up.
    pub fn list(&self) -> Result<Vec<FileEntry>> {
        listing::list_files(&self.root)
    }

    /// Get the root directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the staging directory path
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn path_of(&self, name: &Filename) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Get (or create) the writer lock for `name`
    ///
    /// Locks nobody else holds are dropped from the table on the way.
    fn writer_lock(&self, name: &Filename) -> Arc<Mutex<()>> {
        let mut writers = self.writers.lock();
        writers.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(writers.entry(name.clone()).or_default())
    }
}

fn check_not_reserved(name: &Filename) -> Result<()> {
    if name.as_str() == STAGING_DIR {
        return Err(DiskwireError::InvalidFilename {
            name: name.to_string(),
            reason: "reserved by the store",
        });
    }
    Ok(())
}
