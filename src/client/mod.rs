//! Transfer Client
//!
//! Public operations for the presentation layer. Each remote operation opens
//! one connection, drives one exchange and closes the connection before
//! returning, on success and failure alike.
//!
//! Filenames are validated before any network or disk I/O.

mod connection;

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::config::Config;
use crate::error::{DiskwireError, Result};
use crate::protocol::{CommandFlag, Exchange, Filename};

pub use connection::Connection;

/// Client for a diskwire daemon
#[derive(Debug, Clone)]
pub struct TransferClient {
    config: Config,
}

impl TransferClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Store `payload` on the daemon under `filename`
    ///
    /// Returns once every byte has been handed to the socket. The protocol has
    /// no acknowledgment, so this does not prove the daemon persisted it.
    pub fn upload(&self, filename: &str, payload: &[u8]) -> Result<()> {
        let name = Filename::parse(filename)?;
        let mut source = payload;
        self.put(&name, &mut source, payload.len() as u64)
    }

    /// Stream a local file to the daemon under its own file name
    pub fn upload_path(&self, path: &Path) -> Result<Filename> {
        let raw_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DiskwireError::InvalidFilename {
                name: path.display().to_string(),
                reason: "path has no usable file name",
            })?;
        let name = Filename::parse(raw_name)?;

        let mut file = File::open(path).map_err(|e| not_found_or_io(e, path))?;
        let len = file.metadata()?.len();

        self.put(&name, &mut file, len)?;
        Ok(name)
    }

    /// Fetch `filename` from the daemon into `dest_dir`
    ///
    /// The payload lands in a temporary file inside `dest_dir` and is renamed
    /// into place only once fully received. Returns the bytes written.
    pub fn fetch(&self, filename: &str, dest_dir: &Path) -> Result<u64> {
        let name = Filename::parse(filename)?;
        if !dest_dir.is_dir() {
            return Err(DiskwireError::NotFound(dest_dir.to_path_buf()));
        }

        let mut exchange = self.begin(CommandFlag::Get, &name)?;
        let len = exchange.recv_length()?;
        tracing::debug!("Daemon announced {} bytes for {}", len, name);

        let mut staged = NamedTempFile::new_in(dest_dir)?;
        let written = {
            let mut sink = BufWriter::new(staged.as_file_mut());
            let written = exchange.recv_payload(&mut sink)?;
            sink.flush()?;
            written
        };
        exchange.finish()?;

        let target = dest_dir.join(name.as_str());
        staged
            .persist(&target)
            .map_err(|e| DiskwireError::Io(e.error))?;

        tracing::info!("Fetched {} ({} bytes) into {}", name, written, target.display());
        Ok(written)
    }

    /// Ask the daemon to remove `filename`
    ///
    /// Like PUT, DELETE is not acknowledged.
    pub fn delete_remote(&self, filename: &str) -> Result<()> {
        let name = Filename::parse(filename)?;
        let exchange = self.begin(CommandFlag::Delete, &name)?;
        exchange.finish()?;

        tracing::info!("Requested remote delete of {}", name);
        Ok(())
    }

    // =========================================================================
    // Local Operations
    // =========================================================================

    /// Delete `filename` from `local_dir`
    pub fn remove(&self, local_dir: &Path, filename: &str) -> Result<()> {
        let name = Filename::parse(filename)?;
        let path = local_dir.join(name.as_str());

        fs::remove_file(&path).map_err(|e| not_found_or_io(e, &path))?;

        tracing::info!("Removed {}", path.display());
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn put<R: Read + ?Sized>(&self, name: &Filename, source: &mut R, len: u64) -> Result<()> {
        let mut exchange = self.begin(CommandFlag::Put, name)?;
        exchange.send_payload(source, len)?;
        exchange.finish()?;

        tracing::info!("Uploaded {} ({} bytes)", name, len);
        Ok(())
    }

    /// Open a connection and send the flag and name frame
    fn begin(&self, flag: CommandFlag, name: &Filename) -> Result<Exchange<Connection>> {
        let conn = Connection::open(&self.config)?;
        tracing::debug!("{:?} {} via {}", flag, name, conn.peer_addr());

        let mut exchange = Exchange::new(conn);
        exchange.send_flag(flag)?;
        exchange.send_name(name)?;
        Ok(exchange)
    }
}

fn not_found_or_io(err: std::io::Error, path: &Path) -> DiskwireError {
    if err.kind() == ErrorKind::NotFound {
        DiskwireError::NotFound(path.to_path_buf())
    } else {
        DiskwireError::Io(err)
    }
}
