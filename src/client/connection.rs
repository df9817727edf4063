//! Client connection
//!
//! A TCP stream scoped to one exchange. Dropping it shuts the socket down,
//! so every exit path of an operation closes the connection.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use crate::config::Config;
use crate::error::{DiskwireError, Result};

/// A single-use connection to the daemon
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,

    /// Peer address for logging
    peer_addr: SocketAddr,
}

impl Connection {
    /// Connect to the configured daemon and apply timeouts
    pub fn open(config: &Config) -> Result<Self> {
        let addrs: Vec<SocketAddr> = config
            .daemon_addr
            .to_socket_addrs()
            .map_err(DiskwireError::Connection)?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            let attempt = match config.connect_timeout() {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Self::from_stream(stream, config),
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        let err = last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} resolved to no addresses", config.daemon_addr),
            )
        });
        Err(DiskwireError::from_socket(err, "connect"))
    }

    fn from_stream(stream: TcpStream, config: &Config) -> Result<Self> {
        let peer_addr = stream.peer_addr().map_err(DiskwireError::Connection)?;

        // Small header frames go out immediately
        stream.set_nodelay(true).map_err(DiskwireError::Connection)?;
        stream
            .set_read_timeout(config.io_timeout())
            .map_err(DiskwireError::Connection)?;
        stream
            .set_write_timeout(config.io_timeout())
            .map_err(DiskwireError::Connection)?;

        tracing::debug!("Connected to {}", peer_addr);
        Ok(Self { stream, peer_addr })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The peer may already be gone; nothing useful to do with the error
        let _ = self.stream.shutdown(Shutdown::Both);
        tracing::trace!("Closed connection to {}", self.peer_addr);
    }
}
