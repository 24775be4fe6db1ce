//! Application state shared across all request handlers.

use ordx_core::config::{ConfigStore, IngestConfig, SyncConfig};
use ordx_core::jobs::{JobRegistry, RecomputeCoordinator};
use ordx_core::processors::{
    BlockScanner, BlockSource, CountAggregator, EventIngestor, LocationTracker, MemoryBlockSource,
};
use ordx_core::store::InscriptionStore;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// Cheap to clone; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InscriptionStore>,
    pub ingestor: Arc<EventIngestor>,
    pub coordinator: RecomputeCoordinator,
    /// Blocks pushed to `/blocks`, kept so scans can replay them when no
    /// upstream source is configured.
    pub block_archive: Option<Arc<MemoryBlockSource>>,
    pub ingest_config: ConfigStore<IngestConfig>,
    pub sync_config: ConfigStore<SyncConfig>,
}

impl AppState {
    /// Wire the processors together. Scans fetch from `source`, or from the
    /// push archive when there is none.
    pub fn new(
        store: Arc<dyn InscriptionStore>,
        source: Option<Arc<dyn BlockSource>>,
        ingest_config: ConfigStore<IngestConfig>,
        sync_config: ConfigStore<SyncConfig>,
    ) -> Self {
        let ingestor = Arc::new(EventIngestor::new(store.clone(), ingest_config.clone()));

        let (scan_source, block_archive) = match source {
            Some(source) => (source, None),
            None => {
                let archive = Arc::new(MemoryBlockSource::new());
                let source: Arc<dyn BlockSource> = archive.clone();
                (source, Some(archive))
            }
        };
        let scanner = BlockScanner::new(ingestor.clone(), scan_source, sync_config.clone());
        let coordinator = RecomputeCoordinator::new(
            Arc::new(JobRegistry::default()),
            LocationTracker::new(store.clone()),
            CountAggregator::new(store.clone()),
            Arc::new(scanner),
        );

        Self {
            store,
            ingestor,
            coordinator,
            block_archive,
            ingest_config,
            sync_config,
        }
    }
}
