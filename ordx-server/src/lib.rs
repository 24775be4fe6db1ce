//! ordx server
//!
//! Inscription location and count indexer: a public read API, an admin RPC
//! for recompute and scan jobs, and an optional follower of an upstream
//! block source.

pub mod api;
pub mod config;
pub mod server;
pub mod shutdown;
pub mod state;
