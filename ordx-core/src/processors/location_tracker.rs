//! Location tracker.
//!
//! Rebuilds `genesis_locations` or `current_locations` from the full ledger
//! with the same fold the ingestor applies per block.

use crate::derive::locations::{rebuild_current, rebuild_genesis};
use crate::entities::LocationTable;
use crate::store::{InscriptionStore, LocationRebuild, StoreError};
use kanau::processor::Processor;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Clone)]
pub struct LocationTracker {
    store: Arc<dyn InscriptionStore>,
}

impl LocationTracker {
    pub fn new(store: Arc<dyn InscriptionStore>) -> Self {
        Self { store }
    }
}

impl Processor<LocationTable> for LocationTracker {
    type Output = u64;
    type Error = StoreError;

    /// Replace `table` wholesale. Returns the number of rows written.
    #[tracing::instrument(skip(self), err, name = "LocationTracker::recompute")]
    async fn process(&self, table: LocationTable) -> Result<u64, StoreError> {
        let rebuild: LocationRebuild = match table {
            LocationTable::Genesis => rebuild_genesis,
            LocationTable::Current => rebuild_current,
        };
        let started = Instant::now();
        let rows = self.store.rebuild_locations(table, rebuild).await?;
        info!(
            %table,
            rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Location table rebuilt"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::processors::ingestor::ApplyMode;
    use crate::testing::{block, inscription_id, memory_ingestor, reveal, satpoint, transfer};

    #[tokio::test]
    async fn reposition_scenario() {
        let (store, ingestor) = memory_ingestor(IngestConfig::LEDGER_ONLY);
        let tracker = LocationTracker::new(store.clone());
        let n = 800_000;
        let blocks = [
            block(n, vec![reveal(3, 7, "text/plain", 4, Some("H0"))]),
            block(n + 5, vec![transfer(3, 3, 4, 1, Some("H1"))]),
            block(n + 6, vec![transfer(3, 4, 5, 0, Some("H2"))]),
        ];
        for b in &blocks {
            ingestor.apply_block(b, ApplyMode::Forward).await.unwrap();
        }

        let id = inscription_id(3);
        assert!(store.location(LocationTable::Genesis, &id).await.unwrap().is_none());
        assert!(store.location(LocationTable::Current, &id).await.unwrap().is_none());

        assert_eq!(tracker.process(LocationTable::Genesis).await.unwrap(), 1);
        let genesis = store.location(LocationTable::Genesis, &id).await.unwrap().unwrap();
        assert_eq!(genesis.address.as_deref(), Some("H0"));
        assert_eq!(genesis.key.block_height, n);
        assert_eq!(genesis.satpoint, satpoint(3));
        assert!(store.location(LocationTable::Current, &id).await.unwrap().is_none());

        assert_eq!(tracker.process(LocationTable::Current).await.unwrap(), 1);
        let current = store.location(LocationTable::Current, &id).await.unwrap().unwrap();
        assert_eq!(current.address.as_deref(), Some("H2"));
        assert_eq!(current.key.block_height, n + 6);
        assert_eq!(current.satpoint, satpoint(5));
    }

    #[tokio::test]
    async fn untransferred_inscription_stays_at_genesis() {
        let (store, ingestor) = memory_ingestor(IngestConfig::LEDGER_ONLY);
        ingestor
            .apply_block(&block(10, vec![reveal(1, 0, "text/plain", 0, Some("a"))]), ApplyMode::Forward)
            .await
            .unwrap();
        let tracker = LocationTracker::new(store.clone());
        tracker.process(LocationTable::Genesis).await.unwrap();
        tracker.process(LocationTable::Current).await.unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.genesis, snapshot.current);
    }

    #[tokio::test]
    async fn rebuild_repairs_drifted_rows() {
        let (store, ingestor) = memory_ingestor(IngestConfig::default());
        ingestor
            .apply_block(&block(10, vec![reveal(1, 0, "text/plain", 0, Some("a"))]), ApplyMode::Forward)
            .await
            .unwrap();
        ingestor
            .apply_block(&block(11, vec![transfer(1, 1, 2, 0, Some("b"))]), ApplyMode::Forward)
            .await
            .unwrap();
        let incremental = store.snapshot().await;

        // Point every current row at a satpoint no event ever produced.
        store
            .rebuild_locations(LocationTable::Current, |history| {
                rebuild_current(history)
                    .into_iter()
                    .map(|mut row| {
                        row.satpoint = satpoint(9);
                        row.address = Some("stray".to_string());
                        row
                    })
                    .collect()
            })
            .await
            .unwrap();
        let drifted = store.location(LocationTable::Current, &inscription_id(1)).await.unwrap().unwrap();
        assert_eq!(drifted.satpoint, satpoint(9));
        assert_ne!(store.snapshot().await, incremental);

        let tracker = LocationTracker::new(store.clone());
        tracker.process(LocationTable::Current).await.unwrap();
        let repaired = store.location(LocationTable::Current, &inscription_id(1)).await.unwrap().unwrap();
        assert_eq!(repaired.satpoint, satpoint(2));
        assert_eq!(repaired.address.as_deref(), Some("b"));
        assert_eq!(store.snapshot().await, incremental);
    }

    #[tokio::test]
    async fn concurrent_rebuilds_converge() {
        let (store, ingestor) = memory_ingestor(IngestConfig::LEDGER_ONLY);
        for height in 0..20u8 {
            let mut events = vec![reveal(height + 1, height as i64, "text/plain", 0, Some("a"))];
            if height > 0 {
                events.push(transfer(height, height, height + 100, 1, Some("b")));
            }
            ingestor
                .apply_block(&block(height as u64, events), ApplyMode::Forward)
                .await
                .unwrap();
        }
        let tracker = LocationTracker::new(store.clone());
        tracker.process(LocationTable::Current).await.unwrap();
        let single = store.snapshot().await;

        let (a, b) = tokio::join!(
            tracker.process(LocationTable::Current),
            tracker.process(LocationTable::Current)
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(store.snapshot().await, single);
    }
}
