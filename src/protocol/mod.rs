//! Protocol Module
//!
//! Defines the wire protocol between the transfer client and the storage
//! daemon. One connection carries exactly one command.
//!
//! ## Wire Format (all integers big-endian)
//!
//! | Step | Direction | Field          | Width    |
//! |------|-----------|----------------|----------|
//! | 1    | C→S       | command flag   | 1        |
//! | 2    | C→S       | filename len   | 4        |
//! | 3    | C→S       | filename       | variable |
//! | 4a   | C→S (PUT) | payload len    | 8        |
//! | 4b   | C→S (PUT) | payload        | variable |
//! | 4a   | S→C (GET) | payload len    | 8        |
//! | 4b   | S→C (GET) | payload        | variable |
//!
//! ### Commands
//! - 0x01: PUT    - store a file; no acknowledgment
//! - 0x02: GET    - fetch a file; a missing file is sent as length 0
//! - 0x03: DELETE - remove a file; no acknowledgment
//!
//! PUT carries no acknowledgment: a client cannot tell "daemon persisted the
//! file" from "daemon died after reading the bytes".

mod command;
mod filename;
mod exchange;
pub mod codec;
pub mod frame;

pub use command::{CommandFlag, Request};
pub use filename::{Filename, MAX_FILENAME_LEN};
pub use exchange::{Exchange, ExchangeState};
pub use codec::{encode_request, read_request};
