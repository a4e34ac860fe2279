//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread polling for shutdown
//! - One thread per connection
//! - Commands routed through the Broker

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
