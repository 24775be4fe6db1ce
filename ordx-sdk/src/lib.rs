//! Shared wire types for ordx.
//!
//! The `objects` module holds every JSON shape exchanged with the server:
//! block payloads pushed by the upstream event source, admin RPC queries and
//! job snapshots, and the public read API responses.

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
