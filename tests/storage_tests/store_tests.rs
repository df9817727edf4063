//! Tests for the daemon file Store
//!
//! These tests verify:
//! - Atomic put (short payload leaves the previous file intact)
//! - open_file / delete semantics for present and missing files
//! - In-flight uploads are staged out of reach of clients and listings
//! - Concurrent writers to the same name never interleave

use std::fs;
use std::io::{self, Cursor, Read};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use diskwire::protocol::Filename;
use diskwire::storage::{Store, STAGING_DIR};
use diskwire::DiskwireError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(temp_dir.path()).unwrap();
    (temp_dir, store)
}

fn name(s: &str) -> Filename {
    Filename::parse(s).unwrap()
}

fn staged_count(store: &Store) -> usize {
    fs::read_dir(store.staging_dir()).unwrap().count()
}

/// Reader fed chunk by chunk from another thread; EOF once the sender drops
struct ChannelReader {
    chunks: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.chunks.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("nested").join("store");

    let store = Store::open(&root).unwrap();

    assert!(root.is_dir());
    assert_eq!(store.root(), root.as_path());
}

#[test]
fn test_put_then_open() {
    let (temp, store) = setup_temp_store();

    let written = store
        .put(&name("a.txt"), &mut Cursor::new(b"xyz".to_vec()), 3)
        .unwrap();
    assert_eq!(written, 3);
    assert_eq!(fs::read(temp.path().join("a.txt")).unwrap(), b"xyz");

    let (_file, len) = store.open_file(&name("a.txt")).unwrap().unwrap();
    assert_eq!(len, 3);
}

#[test]
fn test_put_reads_only_declared_length() {
    let (temp, store) = setup_temp_store();
    let mut conn = Cursor::new(b"abcdefgh".to_vec());

    store.put(&name("head"), &mut conn, 4).unwrap();

    assert_eq!(fs::read(temp.path().join("head")).unwrap(), b"abcd");
    assert_eq!(conn.position(), 4);
}

#[test]
fn test_put_overwrites() {
    let (temp, store) = setup_temp_store();

    store.put(&name("f"), &mut Cursor::new(b"first".to_vec()), 5).unwrap();
    store.put(&name("f"), &mut Cursor::new(b"2nd".to_vec()), 3).unwrap();

    assert_eq!(fs::read(temp.path().join("f")).unwrap(), b"2nd");
}

#[test]
fn test_short_put_keeps_previous_file() {
    let (temp, store) = setup_temp_store();
    store.put(&name("f"), &mut Cursor::new(b"intact".to_vec()), 6).unwrap();

    let result = store.put(&name("f"), &mut Cursor::new(b"tru".to_vec()), 100);

    assert!(matches!(
        result,
        Err(DiskwireError::ShortRead { expected: 100, received: 3 })
    ));
    assert_eq!(fs::read(temp.path().join("f")).unwrap(), b"intact");
    // Staging file was cleaned up
    assert_eq!(staged_count(&store), 0);
}

#[test]
fn test_open_missing_file() {
    let (_temp, store) = setup_temp_store();
    assert!(store.open_file(&name("nope")).unwrap().is_none());
}

#[test]
fn test_delete() {
    let (temp, store) = setup_temp_store();
    store.put(&name("d"), &mut Cursor::new(b"x".to_vec()), 1).unwrap();

    assert!(store.delete(&name("d")).unwrap());
    assert!(!temp.path().join("d").exists());
    assert!(!store.delete(&name("d")).unwrap());
}

#[test]
fn test_open_creates_staging_dir() {
    let (temp, store) = setup_temp_store();
    assert_eq!(store.staging_dir(), temp.path().join(STAGING_DIR).as_path());
    assert!(store.staging_dir().is_dir());
}

#[test]
fn test_open_clears_stale_staging_files() {
    let temp_dir = TempDir::new().unwrap();
    let staging = temp_dir.path().join(STAGING_DIR);
    fs::create_dir_all(&staging).unwrap();
    fs::write(staging.join("upload-crashed"), b"partial").unwrap();

    let store = Store::open(temp_dir.path()).unwrap();

    assert_eq!(staged_count(&store), 0);
}

#[test]
fn test_list_skips_staging_dir() {
    let (_temp, store) = setup_temp_store();
    store.put(&name("b.txt"), &mut Cursor::new(b"bb".to_vec()), 2).unwrap();
    store.put(&name("a.txt"), &mut Cursor::new(b"a".to_vec()), 1).unwrap();
    fs::write(store.staging_dir().join("upload-inflight"), b"partial").unwrap();

    let names: Vec<String> = store.list().unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
}

#[test]
fn test_dot_prefixed_names_are_ordinary_files() {
    let (_temp, store) = setup_temp_store();
    store
        .put(&name(".diskwire-report"), &mut Cursor::new(b"abc".to_vec()), 3)
        .unwrap();

    let names: Vec<String> = store.list().unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec![".diskwire-report"]);
}

#[test]
fn test_staging_dir_name_is_reserved() {
    let (_temp, store) = setup_temp_store();
    let reserved = name(STAGING_DIR);

    let put = store.put(&reserved, &mut Cursor::new(b"x".to_vec()), 1);
    assert!(matches!(put, Err(DiskwireError::InvalidFilename { .. })));
    assert!(matches!(
        store.open_file(&reserved),
        Err(DiskwireError::InvalidFilename { .. })
    ));
    assert!(matches!(
        store.delete(&reserved),
        Err(DiskwireError::InvalidFilename { .. })
    ));
    assert!(store.staging_dir().is_dir());
}

#[test]
fn test_in_flight_upload_is_unreachable() {
    let (temp, store) = setup_temp_store();
    let store = Arc::new(store);
    let (tx, rx) = mpsc::channel();

    let uploader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let mut conn = ChannelReader { chunks: rx, pending: Vec::new() };
            store.put(&name("big.bin"), &mut conn, 6)
        })
    };
    tx.send(b"abc".to_vec()).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while staged_count(&store) == 0 {
        assert!(Instant::now() < deadline, "upload never started staging");
        thread::sleep(Duration::from_millis(5));
    }

    // Nothing in the root names the partial upload
    assert!(store.open_file(&name("big.bin")).unwrap().is_none());
    assert!(store.list().unwrap().is_empty());
    for entry in fs::read_dir(temp.path()).unwrap() {
        let entry = entry.unwrap();
        assert!(entry.file_type().unwrap().is_dir());
        assert_eq!(entry.file_name(), STAGING_DIR);
    }

    tx.send(b"def".to_vec()).unwrap();
    assert_eq!(uploader.join().unwrap().unwrap(), 6);
    assert_eq!(fs::read(temp.path().join("big.bin")).unwrap(), b"abcdef");
    assert_eq!(staged_count(&store), 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_same_name() {
    let (temp, store) = setup_temp_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let payload = vec![i; 50_000];
                store
                    .put(&name("shared.bin"), &mut Cursor::new(payload), 50_000)
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Whoever won, the file is one writer's payload, never a mix
    let contents = fs::read(temp.path().join("shared.bin")).unwrap();
    assert_eq!(contents.len(), 50_000);
    assert!(contents.iter().all(|&b| b == contents[0]));
}
