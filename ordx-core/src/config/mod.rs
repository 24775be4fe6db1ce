//! Runtime configuration shared between the core processors and the server.
//!
//! Loading and validating the TOML file is the server's job; these are the
//! validated values it hands over.

mod config_store;

pub use config_store::{ConfigStore, ConfigWatcher};

use std::time::Duration;

/// What the event ingestor maintains besides the ledger tables.
///
/// Hot-reloadable: the ingestor reads a fresh copy for every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    /// Maintain `genesis_locations` / `current_locations` per block.
    pub track_locations: bool,
    /// Maintain `inscription_counts` per block.
    pub track_counts: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            track_locations: true,
            track_counts: true,
        }
    }
}

impl IngestConfig {
    /// Only the ledger is written; derived tables wait for a recompute.
    pub const LEDGER_ONLY: IngestConfig = IngestConfig {
        track_locations: false,
        track_counts: false,
    };
}

/// Upstream block following and scan chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Sleep between polls when caught up or after a failed fetch.
    pub poll_interval: Duration,
    /// First height to fetch when the chain tip is empty.
    pub start_height: u64,
    /// Blocks applied by a scan between two cancellation checks.
    pub scan_chunk_size: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            start_height: 767_430,
            scan_chunk_size: 100,
        }
    }
}
