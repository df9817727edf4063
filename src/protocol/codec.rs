//! Protocol codec
//!
//! Byte sequences for each command, built on the frame codec.
//!
//! ## Request Header
//! ```text
//! ┌──────────┬─────────────┬────────────┬──────────────────┐
//! │ Flag (1) │ NameLen (4) │    Name    │ PayloadLen (8)   │
//! └──────────┴─────────────┴────────────┴──────────────────┘
//!                                         (PUT only)
//! ```
//!
//! ### Per Command
//! - PUT:    header, then exactly PayloadLen payload bytes; no reply
//! - GET:    header without PayloadLen; reply is PayloadLen (8) + payload
//! - DELETE: header without PayloadLen; no reply

use std::io::Read;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DiskwireError, Result};

use super::frame::{self, NAME_LEN_WIDTH, PAYLOAD_LEN_WIDTH};
use super::{CommandFlag, Filename, Request, MAX_FILENAME_LEN};

// =============================================================================
// Encoding
// =============================================================================

/// Encode the name frame: name_len (4) + name
pub fn encode_name_frame(name: &Filename) -> Result<Bytes> {
    let len = frame::encode_uint(name.as_bytes().len() as u64, NAME_LEN_WIDTH)?;

    let mut buf = BytesMut::with_capacity(NAME_LEN_WIDTH + name.as_bytes().len());
    buf.put_slice(&len);
    buf.put_slice(name.as_bytes());
    Ok(buf.freeze())
}

/// Encode a payload length field
pub fn encode_payload_len(len: u64) -> Result<Bytes> {
    Ok(Bytes::from(frame::encode_uint(len, PAYLOAD_LEN_WIDTH)?))
}

/// Encode a complete request header in one buffer
///
/// Format: flag (1) + name_len (4) + name [+ payload_len (8) for PUT]
///
/// For writers that emit the whole header at once, such as raw-socket tools,
/// the test suite and the benchmarks. `TransferClient` sends the same bytes
/// step by step through `Exchange`, which enforces the ordering.
pub fn encode_request(request: &Request) -> Result<Bytes> {
    let name_frame = encode_name_frame(request.name())?;

    let mut buf = BytesMut::with_capacity(1 + name_frame.len() + PAYLOAD_LEN_WIDTH);
    buf.put_u8(request.flag() as u8);
    buf.put_slice(&name_frame);

    if let Request::Put { payload_len, .. } = request {
        buf.put_slice(&encode_payload_len(*payload_len)?);
    }

    Ok(buf.freeze())
}

// =============================================================================
// Decoding
// =============================================================================

/// Read a request header from the stream
///
/// Blocks until the full header is received or the stream fails. For PUT the
/// stream is left positioned at the first payload byte.
pub fn read_request<R: Read + ?Sized>(conn: &mut R) -> Result<Request> {
    let mut flag = [0u8; 1];
    frame::read_exact_into(conn, &mut flag)?;
    let flag = CommandFlag::try_from(flag[0])?;

    let name = read_name_frame(conn)?;

    match flag {
        CommandFlag::Put => {
            let payload_len = read_payload_len(conn)?;
            Ok(Request::Put { name, payload_len })
        }
        CommandFlag::Get => Ok(Request::Get { name }),
        CommandFlag::Delete => Ok(Request::Delete { name }),
    }
}

/// Read a name frame and validate the name
pub fn read_name_frame<R: Read + ?Sized>(conn: &mut R) -> Result<Filename> {
    let len = frame::read_uint(conn, NAME_LEN_WIDTH)?;

    if len > MAX_FILENAME_LEN as u64 {
        return Err(DiskwireError::Protocol(format!(
            "Filename too long: {} bytes (max {})",
            len, MAX_FILENAME_LEN
        )));
    }

    let bytes = frame::read_exact(conn, len as usize)?;
    Filename::from_bytes(&bytes)
}

/// Read an 8-byte payload length field
pub fn read_payload_len<R: Read + ?Sized>(conn: &mut R) -> Result<u64> {
    frame::read_uint(conn, PAYLOAD_LEN_WIDTH)
}
