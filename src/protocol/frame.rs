//! Frame codec
//!
//! Fixed-width big-endian integers and reliable full-buffer transfer over a
//! stream. A single `read`/`write` call on a socket may move fewer bytes than
//! asked for; every function here loops until the requested count is reached
//! or the stream fails.
//!
//! ## Frame Layout
//! ```text
//! ┌──────────────────┬──────────────────────────────┐
//! │ Len (4 or 8, BE) │   Data (exactly Len bytes)   │
//! └──────────────────┴──────────────────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use crate::error::{DiskwireError, Result};

/// Width of the filename length field
pub const NAME_LEN_WIDTH: usize = 4;

/// Width of the payload length field
pub const PAYLOAD_LEN_WIDTH: usize = 8;

/// Widest integer the codec handles
pub const MAX_UINT_WIDTH: usize = 8;

/// Chunk size used when streaming payloads
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

// =============================================================================
// Integer Codec
// =============================================================================

/// Encode `value` as a big-endian integer of exactly `width` bytes
///
/// Fails with `Overflow` if the value needs more than `width` bytes.
pub fn encode_uint(value: u64, width: usize) -> Result<Vec<u8>> {
    if width == 0 || width > MAX_UINT_WIDTH {
        return Err(DiskwireError::Protocol(format!(
            "Unsupported integer width: {} (expected 1..={})",
            width, MAX_UINT_WIDTH
        )));
    }

    if width < MAX_UINT_WIDTH && value >> (width * 8) != 0 {
        return Err(DiskwireError::Overflow { value, width });
    }

    Ok(value.to_be_bytes()[MAX_UINT_WIDTH - width..].to_vec())
}

/// Decode a big-endian integer; the width is the slice length
pub fn decode_uint(bytes: &[u8]) -> Result<u64> {
    if bytes.len() > MAX_UINT_WIDTH {
        return Err(DiskwireError::Protocol(format!(
            "Integer field too wide: {} bytes (max {})",
            bytes.len(),
            MAX_UINT_WIDTH
        )));
    }

    Ok(bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)))
}

// =============================================================================
// Exact Transfer
// =============================================================================

/// Write every byte of `bytes` to the stream
pub fn write_exact<W: Write + ?Sized>(conn: &mut W, bytes: &[u8]) -> Result<()> {
    let mut written = 0;

    while written < bytes.len() {
        match conn.write(&bytes[written..]) {
            Ok(0) => {
                return Err(DiskwireError::ShortWrite {
                    expected: bytes.len() as u64,
                    written: written as u64,
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(DiskwireError::from_socket(e, "write")),
        }
    }

    Ok(())
}

/// Read exactly `n` bytes from the stream
///
/// Callers must bound `n` before calling; the buffer is allocated up front.
pub fn read_exact<R: Read + ?Sized>(conn: &mut R, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    read_exact_into(conn, &mut buf)?;
    Ok(buf)
}

/// Fill `buf` completely from the stream
pub fn read_exact_into<R: Read + ?Sized>(conn: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut received = 0;

    while received < buf.len() {
        match conn.read(&mut buf[received..]) {
            Ok(0) => {
                return Err(DiskwireError::ShortRead {
                    expected: buf.len() as u64,
                    received: received as u64,
                })
            }
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(DiskwireError::from_socket(e, "read")),
        }
    }

    Ok(())
}

/// Write `value` as a `width`-byte big-endian length field
pub fn write_uint<W: Write + ?Sized>(conn: &mut W, value: u64, width: usize) -> Result<()> {
    let bytes = encode_uint(value, width)?;
    write_exact(conn, &bytes)
}

/// Read a `width`-byte big-endian length field
pub fn read_uint<R: Read + ?Sized>(conn: &mut R, width: usize) -> Result<u64> {
    let mut buf = [0u8; MAX_UINT_WIDTH];
    let field = buf.get_mut(..width).ok_or_else(|| {
        DiskwireError::Protocol(format!("Unsupported integer width: {}", width))
    })?;
    read_exact_into(conn, field)?;
    decode_uint(field)
}

// =============================================================================
// Payload Streaming
// =============================================================================

/// Move exactly `n` bytes from the stream into a local sink
///
/// Stream failures are connection errors; sink failures are local I/O errors.
pub fn recv_to<R, W>(conn: &mut R, sink: &mut W, n: u64) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut chunk = vec![0u8; chunk_len(n)];
    let mut received: u64 = 0;

    while received < n {
        let want = (n - received).min(chunk.len() as u64) as usize;
        match conn.read(&mut chunk[..want]) {
            Ok(0) => {
                return Err(DiskwireError::ShortRead {
                    expected: n,
                    received,
                })
            }
            Ok(got) => {
                sink.write_all(&chunk[..got])?;
                received += got as u64;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(DiskwireError::from_socket(e, "read")),
        }
    }

    Ok(received)
}

/// Move exactly `n` bytes from a local source onto the stream
pub fn send_from<R, W>(source: &mut R, conn: &mut W, n: u64) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut chunk = vec![0u8; chunk_len(n)];
    let mut sent: u64 = 0;

    while sent < n {
        let want = (n - sent).min(chunk.len() as u64) as usize;
        source.read_exact(&mut chunk[..want])?;
        write_exact(conn, &chunk[..want])?;
        sent += want as u64;
    }

    Ok(sent)
}

fn chunk_len(n: u64) -> usize {
    usize::try_from(n).map_or(COPY_CHUNK_SIZE, |n| n.min(COPY_CHUNK_SIZE))
}
