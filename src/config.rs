//! Configuration for diskwire
//!
//! Centralized configuration with sensible defaults, shared by the
//! transfer client and the storage daemon.

use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for a diskwire client or daemon
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Daemon address (host:port). The daemon listens here, the client
    /// connects here.
    pub daemon_addr: String,

    /// Connect timeout (milliseconds, 0 = OS default)
    pub connect_timeout_ms: u64,

    /// Per-call read/write deadline on an open connection
    /// (milliseconds, 0 = block forever)
    pub io_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory the daemon persists uploaded files into
    pub storage_dir: PathBuf,

    /// Largest payload the daemon accepts on PUT (bytes)
    pub max_payload_size: u64,

    // -------------------------------------------------------------------------
    // Daemon Configuration
    // -------------------------------------------------------------------------
    /// Number of worker threads handling connections
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_addr: "127.0.0.1:65431".to_string(),
            connect_timeout_ms: 5000,
            io_timeout_ms: 30_000,
            storage_dir: PathBuf::from("./data"),
            max_payload_size: 4 * 1024 * 1024 * 1024, // 4 GB
            workers: 4,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Connect timeout, `None` when disabled
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.connect_timeout_ms)
    }

    /// Read/write deadline, `None` when disabled
    pub fn io_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.io_timeout_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the daemon address
    pub fn daemon_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.daemon_addr = addr.into();
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read/write deadline (in milliseconds)
    pub fn io_timeout_ms(mut self, ms: u64) -> Self {
        self.config.io_timeout_ms = ms;
        self
    }

    /// Set the daemon's storage directory
    pub fn storage_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = path.into();
        self
    }

    /// Set the largest accepted PUT payload (in bytes)
    pub fn max_payload_size(mut self, size: u64) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Set the number of daemon worker threads
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
