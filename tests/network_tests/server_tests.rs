//! Tests for the storage daemon
//!
//! These tests verify:
//! - Upload / fetch round trips through the real daemon
//! - Remote delete
//! - Rejected requests (bad names, unknown flags, oversize payloads)
//!   never touch disk and never stop the daemon
//! - Graceful shutdown

use std::fs;
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use diskwire::network::{Server, ShutdownHandle};
use diskwire::storage::Store;
use diskwire::{Config, DiskwireError, TransferClient};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// A daemon running on its own thread, stopped on drop
///
/// One worker, so connections are served strictly in accept order and an
/// upload is persisted before the next request is looked at.
struct TestDaemon {
    _temp: TempDir,
    storage_dir: PathBuf,
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<diskwire::Result<()>>>,
}

impl TestDaemon {
    fn start() -> Self {
        Self::start_with(|builder| builder)
    }

    fn start_with(
        customize: impl FnOnce(diskwire::config::ConfigBuilder) -> diskwire::config::ConfigBuilder,
    ) -> Self {
        let temp = TempDir::new().unwrap();
        let storage_dir = temp.path().join("store");

        let config = customize(
            Config::builder()
                .daemon_addr("127.0.0.1:0")
                .storage_dir(&storage_dir)
                .io_timeout_ms(2000)
                .workers(1),
        )
        .build();

        let store = Arc::new(Store::open(&config.storage_dir).unwrap());
        let server = Server::bind(config, store).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle().unwrap();
        let thread = thread::spawn(move || server.run());

        Self {
            _temp: temp,
            storage_dir,
            addr,
            shutdown,
            thread: Some(thread),
        }
    }

    fn client(&self) -> TransferClient {
        TransferClient::new(
            Config::builder()
                .daemon_addr(self.addr.to_string())
                .io_timeout_ms(2000)
                .build(),
        )
    }

    fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn stop(&mut self) -> diskwire::Result<()> {
        self.shutdown.shutdown();
        match self.thread.take() {
            Some(thread) => thread.join().unwrap(),
            None => Ok(()),
        }
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_upload_fetch_round_trip_sizes() {
    let daemon = TestDaemon::start();
    let client = daemon.client();
    let downloads = TempDir::new().unwrap();

    for size in [0usize, 1, 7, 4096, 65_537, 300_000] {
        let payload: Vec<u8> = (0..size).map(|i| (i * 31 % 256) as u8).collect();
        let name = format!("file-{}.bin", size);

        client.upload(&name, &payload).unwrap();
        let written = client.fetch(&name, downloads.path()).unwrap();

        assert_eq!(written, size as u64);
        assert_eq!(fs::read(downloads.path().join(&name)).unwrap(), payload);
    }
}

#[test]
fn test_upload_persists_in_storage_dir() {
    let daemon = TestDaemon::start();
    let client = daemon.client();

    client.upload("a.txt", b"xyz").unwrap();
    // Any follow-up request is served after the upload completes
    client.delete_remote("unrelated").unwrap();
    client.fetch("a.txt", TempDir::new().unwrap().path()).unwrap();

    assert_eq!(fs::read(daemon.storage_dir().join("a.txt")).unwrap(), b"xyz");
}

#[test]
fn test_upload_path_round_trip() {
    let daemon = TestDaemon::start();
    let client = daemon.client();
    let local = TempDir::new().unwrap();
    let downloads = TempDir::new().unwrap();

    let path = local.path().join("photo.jpg");
    fs::write(&path, vec![0xAB; 10_000]).unwrap();

    client.upload_path(&path).unwrap();
    client.fetch("photo.jpg", downloads.path()).unwrap();

    assert_eq!(fs::read(downloads.path().join("photo.jpg")).unwrap(), vec![0xAB; 10_000]);
}

#[test]
fn test_fetch_missing_is_empty() {
    let daemon = TestDaemon::start();
    let downloads = TempDir::new().unwrap();

    let written = daemon.client().fetch("never-uploaded", downloads.path()).unwrap();

    assert_eq!(written, 0);
    assert_eq!(fs::read(downloads.path().join("never-uploaded")).unwrap(), b"");
}

#[test]
fn test_delete_remote() {
    let daemon = TestDaemon::start();
    let client = daemon.client();
    let downloads = TempDir::new().unwrap();

    client.upload("temp.txt", b"short lived").unwrap();
    client.delete_remote("temp.txt").unwrap();
    let written = client.fetch("temp.txt", downloads.path()).unwrap();

    assert_eq!(written, 0);
    assert!(!daemon.storage_dir().join("temp.txt").exists());
}

// =============================================================================
// Rejected Request Tests
// =============================================================================

#[test]
fn test_traversal_name_rejected_by_daemon() {
    let daemon = TestDaemon::start();

    // Bypass the client's own validation with a hand-built request
    let mut request = vec![0x01, 0x00, 0x00, 0x00, 0x0A];
    request.extend_from_slice(b"../evil.sh");
    request.extend_from_slice(&4u64.to_be_bytes());
    request.extend_from_slice(b"boom");
    let mut stream = TcpStream::connect(daemon.addr).unwrap();
    stream.write_all(&request).unwrap();
    drop(stream);

    // Daemon keeps serving
    let client = daemon.client();
    client.upload("ok.txt", b"fine").unwrap();
    client.fetch("ok.txt", TempDir::new().unwrap().path()).unwrap();

    let parent = daemon.storage_dir().parent().unwrap();
    assert!(!parent.join("evil.sh").exists());
    assert!(daemon.storage_dir().join("ok.txt").exists());
}

#[test]
fn test_unknown_flag_does_not_stop_daemon() {
    let daemon = TestDaemon::start();

    let mut stream = TcpStream::connect(daemon.addr).unwrap();
    stream.write_all(&[0x09, 0x00, 0x00, 0x00, 0x01, b'x']).unwrap();
    drop(stream);

    let client = daemon.client();
    let downloads = TempDir::new().unwrap();
    client.upload("after.txt", b"still here").unwrap();
    client.fetch("after.txt", downloads.path()).unwrap();

    assert_eq!(fs::read(downloads.path().join("after.txt")).unwrap(), b"still here");
}

#[test]
fn test_empty_connection_is_ignored() {
    let daemon = TestDaemon::start();

    drop(TcpStream::connect(daemon.addr).unwrap());

    let client = daemon.client();
    client.upload("x", b"1").unwrap();
    assert_eq!(client.fetch("x", TempDir::new().unwrap().path()).unwrap(), 1);
}

#[test]
fn test_oversize_payload_not_stored() {
    let daemon = TestDaemon::start_with(|b| b.max_payload_size(16));
    let client = daemon.client();
    let downloads = TempDir::new().unwrap();

    // The daemon may hang up mid-upload; either outcome is acceptable here
    let _ = client.upload("huge.bin", &[0u8; 64]);
    client.upload("small.bin", &[1u8; 16]).unwrap();

    assert_eq!(client.fetch("huge.bin", downloads.path()).unwrap(), 0);
    assert_eq!(client.fetch("small.bin", downloads.path()).unwrap(), 16);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_shutdown_stops_run() {
    let mut daemon = TestDaemon::start();
    daemon.client().upload("before.txt", b"x").unwrap();

    assert!(daemon.stop().is_ok());

    let result = daemon.client().upload("after.txt", b"x");
    assert!(matches!(result, Err(DiskwireError::Connection(_))));
}

#[test]
fn test_zero_workers_rejected() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .daemon_addr("127.0.0.1:0")
        .storage_dir(temp.path())
        .workers(0)
        .build();
    let store = Arc::new(Store::open(temp.path()).unwrap());

    let result = Server::bind(config, store);
    assert!(matches!(result, Err(DiskwireError::Config(_))));
}
