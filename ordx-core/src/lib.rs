#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod derive;
pub mod entities;
pub mod framework;
pub mod jobs;
pub mod ordinals;
pub mod processors;
pub mod store;

#[cfg(test)]
mod testing;
