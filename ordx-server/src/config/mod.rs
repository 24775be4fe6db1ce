//! Configuration module for ordx-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;

use crate::config::file::FileConfig;
use ordx_core::config::{IngestConfig, SyncConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Listener addresses. Read once at startup; not reloadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub admin_listen: SocketAddr,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub sync: SyncConfig,
    pub source_url: Option<Url>,
}

/// CLI overrides applied on top of the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenOverrides {
    pub listen: Option<SocketAddr>,
    pub admin_listen: Option<SocketAddr>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    overrides: ListenOverrides,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, overrides: ListenOverrides) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            overrides,
        }
    }

    /// Read the TOML file, apply CLI overrides and validate.
    ///
    /// A missing file is not an error: every section has defaults.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults"
                );
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        self.build(file_config)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn build(&self, file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
        let server = ServerConfig {
            listen: self.overrides.listen.unwrap_or(file_config.server.listen),
            admin_listen: self
                .overrides
                .admin_listen
                .unwrap_or(file_config.server.admin_listen),
        };
        validate(&server, &file_config)?;

        Ok(LoadedConfig {
            server,
            ingest: IngestConfig {
                track_locations: file_config.ingest.track_locations,
                track_counts: file_config.ingest.track_counts,
            },
            sync: SyncConfig {
                poll_interval: Duration::from_secs(file_config.sync.poll_interval_secs),
                start_height: file_config.sync.start_height,
                scan_chunk_size: file_config.sync.scan_chunk_size,
            },
            source_url: file_config.sync.source_url,
        })
    }
}

fn validate(server: &ServerConfig, config: &FileConfig) -> Result<(), ConfigError> {
    if server.listen == server.admin_listen {
        return Err(ConfigError::ValidationError(format!(
            "listen and admin_listen must differ, both are {}",
            server.listen
        )));
    }
    if config.sync.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sync.poll_interval_secs must be at least 1".to_string(),
        ));
    }
    if config.sync.scan_chunk_size == 0 {
        return Err(ConfigError::ValidationError(
            "sync.scan_chunk_size must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// The database URL from the environment, if set.
pub fn get_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> ConfigLoader {
        ConfigLoader::new("./does-not-exist.toml", ListenOverrides::default())
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let loaded = loader().load().unwrap();
        assert_eq!(loaded.ingest, IngestConfig::default());
        assert_eq!(loaded.sync, SyncConfig::default());
        assert!(loaded.source_url.is_none());
    }

    #[test]
    fn test_cli_overrides_win() {
        let listen: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let loader = ConfigLoader::new(
            "./does-not-exist.toml",
            ListenOverrides {
                listen: Some(listen),
                admin_listen: None,
            },
        );
        let loaded = loader.load().unwrap();
        assert_eq!(loaded.server.listen, listen);
        assert_eq!(loaded.server.admin_listen.port(), 3001);
    }

    #[test]
    fn test_rejects_shared_listener() {
        let mut config = FileConfig::default();
        config.server.admin_listen = config.server.listen;
        assert!(matches!(
            loader().build(config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let mut config = FileConfig::default();
        config.sync.scan_chunk_size = 0;
        assert!(matches!(
            loader().build(config),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
