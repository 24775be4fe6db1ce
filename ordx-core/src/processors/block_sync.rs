//! Block sources and the chain-following sync runner.
//!
//! A [`BlockSource`] hands out the canonical inscription events of a block
//! by height. The [`BlockSyncRunner`] follows the chain tip with it, and
//! scan jobs use the same source to replay older ranges.

use crate::config::{ConfigStore, ConfigWatcher, SyncConfig};
use crate::processors::ingestor::{ApplyMode, EventIngestor, IngestError};
use async_trait::async_trait;
use ordx_sdk::objects::blocks::BlockEvents;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info};
use url::Url;

#[derive(Debug, Error)]
pub enum BlockSourceError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid source url: {0}")]
    Url(#[from] url::ParseError),

    #[error("source answered {status} for block {height}")]
    Status { height: u64, status: u16 },

    #[error("source returned block {returned} when asked for {requested}")]
    HeightMismatch { requested: u64, returned: u64 },
}

#[async_trait]
pub trait BlockSource: Send + Sync {
    /// The block at `height`, or `None` if the source does not have it yet.
    async fn fetch_block(&self, height: u64) -> Result<Option<BlockEvents>, BlockSourceError>;
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

/// Fetches `GET {base_url}/blocks/{height}` from an upstream event source.
pub struct HttpBlockSource {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpBlockSource {
    pub fn new(mut base_url: Url) -> Self {
        // `Url::join` replaces the last path segment unless it ends in `/`.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http_client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn block_url(&self, height: u64) -> Result<Url, BlockSourceError> {
        Ok(self.base_url.join(&format!("blocks/{height}"))?)
    }
}

#[async_trait]
impl BlockSource for HttpBlockSource {
    async fn fetch_block(&self, height: u64) -> Result<Option<BlockEvents>, BlockSourceError> {
        let response = self.http_client.get(self.block_url(height)?).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(BlockSourceError::Status {
                height,
                status: status.as_u16(),
            });
        }
        let block: BlockEvents = response.json().await?;
        if block.height != height {
            return Err(BlockSourceError::HeightMismatch {
                requested: height,
                returned: block.height,
            });
        }
        Ok(Some(block))
    }
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

/// Blocks held in process.
///
/// Without an upstream, the server archives pushed blocks here so scan jobs
/// can replay them.
#[derive(Debug, Default)]
pub struct MemoryBlockSource {
    blocks: RwLock<BTreeMap<u64, BlockEvents>>,
}

impl MemoryBlockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocks(blocks: impl IntoIterator<Item = BlockEvents>) -> Self {
        Self {
            blocks: RwLock::new(blocks.into_iter().map(|b| (b.height, b)).collect()),
        }
    }

    /// Store a block, replacing any earlier block at the same height.
    pub async fn insert(&self, block: BlockEvents) {
        self.blocks.write().await.insert(block.height, block);
    }
}

#[async_trait]
impl BlockSource for MemoryBlockSource {
    async fn fetch_block(&self, height: u64) -> Result<Option<BlockEvents>, BlockSourceError> {
        Ok(self.blocks.read().await.get(&height).cloned())
    }
}

// ---------------------------------------------------------------------------
// BlockSyncRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] BlockSourceError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Applied { height: u64 },
    CaughtUp { next_height: u64 },
}

/// Follows the chain tip: fetch `tip + 1`, apply it, repeat; sleep for the
/// poll interval when caught up or after an error.
pub struct BlockSyncRunner {
    ingestor: Arc<EventIngestor>,
    source: Arc<dyn BlockSource>,
    config: ConfigStore<SyncConfig>,
    config_watcher: ConfigWatcher,
    shutdown_rx: watch::Receiver<bool>,
}

impl BlockSyncRunner {
    pub fn new(
        ingestor: Arc<EventIngestor>,
        source: Arc<dyn BlockSource>,
        config: ConfigStore<SyncConfig>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let config_watcher = config.subscribe();
        Self {
            ingestor,
            source,
            config,
            config_watcher,
            shutdown_rx,
        }
    }

    /// Fetch and apply the next block, if the source has it.
    pub async fn sync_once(&self, config: &SyncConfig) -> Result<SyncStep, SyncError> {
        let next_height = match self
            .ingestor
            .store()
            .chain_tip()
            .await
            .map_err(IngestError::from)?
        {
            Some(tip) => tip + 1,
            None => config.start_height,
        };
        let Some(block) = self.source.fetch_block(next_height).await? else {
            return Ok(SyncStep::CaughtUp { next_height });
        };
        self.ingestor.apply_block(&block, ApplyMode::Forward).await?;
        Ok(SyncStep::Applied {
            height: next_height,
        })
    }

    pub async fn run(mut self) {
        info!("BlockSyncRunner started");
        let mut config_open = true;

        loop {
            let config = self.config.snapshot().await;
            let delay = match self.sync_once(&config).await {
                Ok(SyncStep::Applied { height }) => {
                    debug!(height, "Synced block");
                    Duration::ZERO
                }
                Ok(SyncStep::CaughtUp { next_height }) => {
                    debug!(next_height, "Caught up with block source");
                    config.poll_interval
                }
                Err(e) => {
                    error!(error = %e, "Block sync failed, retrying after poll interval");
                    config.poll_interval
                }
            };

            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("BlockSyncRunner shutting down");
                        break;
                    }
                }

                changed = self.config_watcher.changed(), if config_open => {
                    match changed {
                        Ok(()) => info!("Sync configuration reloaded"),
                        Err(_) => config_open = false,
                    }
                }

                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
