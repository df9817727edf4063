//! Network Module
//!
//! The storage daemon's TCP side.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Fixed pool of worker threads fed over a channel
//! - One request per connection, performed against the `Store`

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::ConnectionHandler;
