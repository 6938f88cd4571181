//! Network Module
//!
//! TCP server, per-connection handling and a blocking client.
//!
//! ## Architecture
//! - Single non-blocking acceptor thread
//! - Fixed pool of `max_connections` workers fed over a bounded channel
//! - Commands routed through `Engine::execute`

mod server;
mod connection;
mod client;

pub use server::Server;
pub use connection::Connection;
pub use client::Client;
