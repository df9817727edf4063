//! Command definitions
//!
//! The command flag is always the first byte on a connection and decides how
//! every following byte is read.

use crate::error::DiskwireError;

use super::Filename;

/// Command flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandFlag {
    Put = 0x01,
    Get = 0x02,
    Delete = 0x03,
}

impl TryFrom<u8> for CommandFlag {
    type Error = DiskwireError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(CommandFlag::Put),
            0x02 => Ok(CommandFlag::Get),
            0x03 => Ok(CommandFlag::Delete),
            _ => Err(DiskwireError::Protocol(format!(
                "Unknown command flag: 0x{:02x}",
                byte
            ))),
        }
    }
}

/// A parsed request header
///
/// The PUT payload itself is not part of the header; it follows on the
/// stream and is moved by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Store `payload_len` bytes under `name`
    Put { name: Filename, payload_len: u64 },

    /// Send the file stored under `name`
    Get { name: Filename },

    /// Remove the file stored under `name`
    Delete { name: Filename },
}

impl Request {
    /// Get the command flag
    pub fn flag(&self) -> CommandFlag {
        match self {
            Request::Put { .. } => CommandFlag::Put,
            Request::Get { .. } => CommandFlag::Get,
            Request::Delete { .. } => CommandFlag::Delete,
        }
    }

    /// Get the target filename
    pub fn name(&self) -> &Filename {
        match self {
            Request::Put { name, .. } | Request::Get { name } | Request::Delete { name } => name,
        }
    }
}
