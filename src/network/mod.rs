//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop
//! - One thread per connection, one request in flight per connection
//! - Requests executed against the shared MemStore

mod server;
mod connection;

pub use server::Server;
pub use connection::Connection;
