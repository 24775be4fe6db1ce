//! TOML file configuration structures.
//!
//! These structs directly map to the `ordx-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Public read API (e.g., "0.0.0.0:3000").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    /// Admin RPC. Unauthenticated; bind it to a private interface.
    #[serde(default = "default_admin_listen_addr")]
    pub admin_listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
            admin_listen: default_admin_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_admin_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}

/// Derived tables the ingestor maintains per block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_true")]
    pub track_locations: bool,
    #[serde(default = "default_true")]
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

fn default_true() -> bool {
    true
}

/// Upstream event source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL serving `GET {source_url}/blocks/{height}`. Without it the
    /// server only ingests blocks pushed to the admin `/blocks` endpoint.
    pub source_url: Option<Url>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_start_height")]
    pub start_height: u64,
    #[serde(default = "default_scan_chunk_size")]
    pub scan_chunk_size: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            poll_interval_secs: default_poll_interval_secs(),
            start_height: default_start_height(),
            scan_chunk_size: default_scan_chunk_size(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    10
}

/// First block with an inscription.
fn default_start_height() -> u64 {
    767_430
}

fn default_scan_chunk_size() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:4000"
admin_listen = "127.0.0.1:4001"

[ingest]
track_locations = true
track_counts = false

[sync]
source_url = "http://chainhook:20456/ordinals"
poll_interval_secs = 5
start_height = 800000
scan_chunk_size = 50
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 4000);
        assert_eq!(config.server.admin_listen.port(), 4001);
        assert!(config.ingest.track_locations);
        assert!(!config.ingest.track_counts);
        assert_eq!(
            config.sync.source_url.unwrap().as_str(),
            "http://chainhook:20456/ordinals"
        );
        assert_eq!(config.sync.poll_interval_secs, 5);
        assert_eq!(config.sync.start_height, 800_000);
        assert_eq!(config.sync.scan_chunk_size, 50);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert_eq!(config.server.admin_listen, default_admin_listen_addr());
        assert!(config.ingest.track_locations);
        assert!(config.ingest.track_counts);
        assert!(config.sync.source_url.is_none());
        assert_eq!(config.sync.start_height, 767_430);
    }
}
