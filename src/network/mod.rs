//! Network Module
//!
//! TCP server, per-connection handling, and a blocking client.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection, capped at `max_connections`
//! - Commands routed through `Engine::execute`

mod client;
mod connection;
mod server;

pub use client::Client;
pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
