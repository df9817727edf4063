//! Client-side exchange
//!
//! Drives one command over one connection and refuses any step taken out of
//! order.
//!
//! ## State Machine
//! ```text
//! Idle ─flag─▶ FlagSent ─name─▶ NameSent ─┬─payload (PUT)──────────────▶ PayloadSent ─▶ Closed
//!                                          ├─length (GET)─▶ AwaitingLength ─▶ AwaitingPayload ─▶ Closed
//!                                          └─finish (DELETE)─────────────────────────────────▶ Closed
//! ```
//!
//! Any error moves the exchange to `Closed`. There is no retry within a
//! connection; callers open a new one.

use std::io::{Read, Write};

use crate::error::{DiskwireError, Result};

use super::codec::{encode_name_frame, encode_payload_len, read_payload_len};
use super::frame;
use super::{CommandFlag, Filename};

/// Where an exchange currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    FlagSent,
    NameSent,
    PayloadSent,
    AwaitingLength,
    AwaitingPayload,
    Closed,
}

/// One command/response exchange over a stream
#[derive(Debug)]
pub struct Exchange<S> {
    stream: S,
    state: ExchangeState,
    command: Option<CommandFlag>,
    payload_len: u64,
    failed: bool,
}

impl<S: Read + Write> Exchange<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            state: ExchangeState::Idle,
            command: None,
            payload_len: 0,
            failed: false,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Send the 1-byte command flag
    pub fn send_flag(&mut self, flag: CommandFlag) -> Result<()> {
        self.advance(ExchangeState::Idle, None, ExchangeState::FlagSent)?;
        self.command = Some(flag);
        let result = frame::write_exact(&mut self.stream, &[flag as u8]);
        self.guard(result)
    }

    /// Send the name frame
    pub fn send_name(&mut self, name: &Filename) -> Result<()> {
        self.advance(ExchangeState::FlagSent, None, ExchangeState::NameSent)?;
        let result = encode_name_frame(name)
            .and_then(|bytes| frame::write_exact(&mut self.stream, &bytes));
        self.guard(result)
    }

    /// Send the payload length and exactly `len` bytes from `source` (PUT)
    pub fn send_payload<R: Read + ?Sized>(&mut self, source: &mut R, len: u64) -> Result<u64> {
        self.advance(
            ExchangeState::NameSent,
            Some(CommandFlag::Put),
            ExchangeState::PayloadSent,
        )?;
        let result = encode_payload_len(len)
            .and_then(|bytes| frame::write_exact(&mut self.stream, &bytes))
            .and_then(|()| frame::send_from(source, &mut self.stream, len));
        self.guard(result)
    }

    /// Receive the 8-byte payload length (GET)
    pub fn recv_length(&mut self) -> Result<u64> {
        self.advance(
            ExchangeState::NameSent,
            Some(CommandFlag::Get),
            ExchangeState::AwaitingLength,
        )?;
        // Flush anything buffered before blocking on the peer
        let result = self
            .stream
            .flush()
            .map_err(|e| DiskwireError::from_socket(e, "flush"))
            .and_then(|()| read_payload_len(&mut self.stream));
        let len = self.guard(result)?;

        self.payload_len = len;
        self.state = ExchangeState::AwaitingPayload;
        Ok(len)
    }

    /// Receive exactly the announced payload into `sink` (GET)
    pub fn recv_payload<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64> {
        self.advance(
            ExchangeState::AwaitingPayload,
            Some(CommandFlag::Get),
            ExchangeState::Closed,
        )?;
        let result = frame::recv_to(&mut self.stream, sink, self.payload_len);
        self.guard(result)
    }

    /// Complete the exchange and hand back the stream
    ///
    /// PUT must have sent its payload, GET must have received it, DELETE
    /// only needs its name.
    pub fn finish(mut self) -> Result<S> {
        let complete = match (self.command, self.state) {
            (Some(CommandFlag::Put), ExchangeState::PayloadSent) => true,
            (Some(CommandFlag::Get), ExchangeState::Closed) => true,
            (Some(CommandFlag::Delete), ExchangeState::NameSent) => true,
            _ => false,
        };
        if self.failed || !complete {
            return Err(DiskwireError::Protocol(format!(
                "Exchange finished early in state {:?}",
                self.state
            )));
        }

        self.stream
            .flush()
            .map_err(|e| DiskwireError::from_socket(e, "flush"))?;
        self.state = ExchangeState::Closed;
        Ok(self.stream)
    }

    fn advance(
        &mut self,
        from: ExchangeState,
        command: Option<CommandFlag>,
        to: ExchangeState,
    ) -> Result<()> {
        let command_ok = command.map_or(true, |c| self.command == Some(c));
        if self.state != from || !command_ok {
            let err = DiskwireError::Protocol(format!(
                "Invalid exchange step {:?} -> {:?} for {:?}",
                self.state, to, self.command
            ));
            self.state = ExchangeState::Closed;
            self.failed = true;
            return Err(err);
        }
        self.state = to;
        Ok(())
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = ExchangeState::Closed;
            self.failed = true;
        }
        result
    }
}
