//! Connection Handler
//!
//! Handles one client connection: read one request, perform it, close.

use std::io::{BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{DiskwireError, Result};
use crate::protocol::codec::read_request;
use crate::protocol::frame::{self, PAYLOAD_LEN_WIDTH};
use crate::protocol::{Filename, Request};
use crate::storage::Store;

/// Handles a single client connection
pub struct ConnectionHandler {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the file store
    store: Arc<Store>,

    /// Largest PUT payload accepted
    max_payload_size: u64,

    /// Peer address for logging
    peer_addr: String,
}

impl ConnectionHandler {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and applies the configured I/O deadline
    pub fn new(stream: TcpStream, store: Arc<Store>, config: &Config) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;
        stream.set_read_timeout(config.io_timeout())?;
        stream.set_write_timeout(config.io_timeout())?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            store,
            max_payload_size: config.max_payload_size,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until the exchange completes)
    ///
    /// Exactly one request is served; the connection is closed when the
    /// handler is dropped.
    pub fn handle(&mut self) -> Result<()> {
        let request = match read_request(&mut self.reader) {
            Ok(request) => request,
            Err(DiskwireError::ShortRead { received: 0, expected: 1 }) => {
                // Connected and closed without sending a command
                tracing::debug!("Client {} closed before sending a command", self.peer_addr);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        tracing::debug!("Received {:?} from {}", request.flag(), self.peer_addr);

        match request {
            Request::Put { name, payload_len } => self.handle_put(&name, payload_len),
            Request::Get { name } => self.handle_get(&name),
            Request::Delete { name } => self.handle_delete(&name),
        }
    }

    fn handle_put(&mut self, name: &Filename, payload_len: u64) -> Result<()> {
        if payload_len > self.max_payload_size {
            return Err(DiskwireError::Protocol(format!(
                "Payload too large: {} bytes (max {})",
                payload_len, self.max_payload_size
            )));
        }

        let written = self.store.put(name, &mut self.reader, payload_len)?;
        tracing::info!("PUT {} ({} bytes) from {}", name, written, self.peer_addr);
        Ok(())
    }

    fn handle_get(&mut self, name: &Filename) -> Result<()> {
        // A missing file is indistinguishable from an empty one on the wire
        match self.store.open_file(name)? {
            Some((file, len)) => {
                let mut source = BufReader::new(file);
                frame::write_uint(&mut self.writer, len, PAYLOAD_LEN_WIDTH)?;
                frame::send_from(&mut source, &mut self.writer, len)?;
                tracing::info!("GET {} ({} bytes) to {}", name, len, self.peer_addr);
            }
            None => {
                frame::write_uint(&mut self.writer, 0, PAYLOAD_LEN_WIDTH)?;
                tracing::warn!("GET {} from {}: no such file, sent empty payload", name, self.peer_addr);
            }
        }

        self.writer
            .flush()
            .map_err(|e| DiskwireError::from_socket(e, "flush"))
    }

    fn handle_delete(&mut self, name: &Filename) -> Result<()> {
        if self.store.delete(name)? {
            tracing::info!("DELETE {} from {}", name, self.peer_addr);
        } else {
            tracing::warn!("DELETE {} from {}: no such file", name, self.peer_addr);
        }
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
