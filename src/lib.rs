//! # diskwire
//!
//! File transfer between a client and a storage daemon over a minimal
//! length-prefixed TCP protocol:
//! - One command per connection (PUT / GET / DELETE)
//! - Fixed-width big-endian length fields
//! - Full-buffer reads and writes that survive fragmented streams
//! - Filename validation before any I/O
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────┐                 ┌───────────────────────┐
//! │    TransferClient     │                 │        Server         │
//! │ upload/fetch/delete   │                 │ acceptor + workers    │
//! └───────────┬───────────┘                 └───────────┬───────────┘
//!             │                                         │
//! ┌───────────▼───────────┐      TCP        ┌───────────▼───────────┐
//! │  Exchange (protocol)  │ ◀─────────────▶ │ ConnectionHandler     │
//! └───────────┬───────────┘                 └───────────┬───────────┘
//!             │                                         │
//! ┌───────────▼───────────┐                 ┌───────────▼───────────┐
//! │     Frame Codec       │                 │        Store          │
//! └───────────────────────┘                 └───────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod client;
pub mod storage;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DiskwireError, Result};
pub use config::Config;
pub use client::TransferClient;
pub use protocol::Filename;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of diskwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
