//! Storage Module
//!
//! Filesystem side of diskwire.
//!
//! ## Responsibilities
//! - Daemon file store: atomic writes, per-name writer locks
//! - Local directory listing with human-readable sizes
//!
//! ## Layout
//! ```text
//! {storage_dir}/
//!   ├── report.pdf
//!   ├── notes.txt
//!   └── .staging/
//!       └── upload-XXXXXX  (upload in flight)
//! ```

mod store;
pub mod listing;

pub use store::{Store, STAGING_DIR};
pub use listing::{format_size, list_files, size_of, FileEntry};
