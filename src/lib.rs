//!UDP hole punching with a minimal rendezvous ("STUN-like") server.
//!
//!Two clients behind NATs cannot address each other directly: each only has a
//!private address, and its public one exists only as a mapping inside its NAT.
//!The rendezvous server is reachable by both; it observes the post-NAT source
//!address of each registration and hands every client the other's observed
//!(global) and self-reported (local) address plus a pairing id.
//!
//!From there the clients are on their own. Both send an opener toward the
//!peer's global address from the very port they registered with, so the NAT
//!mapping created by registration stays valid for punching. A short receive
//!timeout turns "no reply" into a fallback to the peer's local address, which
//!covers the case where both clients sit on the same network and the NAT
//!never needed punching at all.
//!
//!The essential is, the same socket and port are used against the rendezvous
//!server and the peer for the whole session.
//!
//!## Feature flags
//!For convenient, the crate include both client and server code by default.
//!Mostly you only use client or server code, set features to `client` or
//!`server` instead.
//!
//!```text
//!udppunch = { version = "0.1", default-features=false, features=["client"]}
//!```
//!
//!- `client`: udp punch client
//!- `server`: rendezvous server

mod error;
pub use error::{Error, Result};

pub mod proto;
pub mod udp;
