//! UDP rendezvous and hole punching.
//!
//! use `Client` to bind, register and punch toward a peer.
//!
//! use `Server` to pair two clients.

#[cfg(feature = "client")]
mod client;
#[cfg(feature = "client")]
pub use client::Client;

#[cfg(feature = "server")]
mod server;
#[cfg(feature = "server")]
pub use server::Server;
