//! Count aggregator.
//!
//! Rebuilds one category of `inscription_counts` from the inscriptions and
//! the derived location tables, keyed by the same function the ingestor
//! uses for its per-block deltas.

use crate::derive::counts::tally;
use crate::entities::CountCategory;
use crate::store::{CountRebuild, InscriptionStore, StoreError};
use kanau::processor::Processor;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Clone)]
pub struct CountAggregator {
    store: Arc<dyn InscriptionStore>,
}

impl CountAggregator {
    pub fn new(store: Arc<dyn InscriptionStore>) -> Self {
        Self { store }
    }
}

impl Processor<CountCategory> for CountAggregator {
    type Output = u64;
    type Error = StoreError;

    #[tracing::instrument(skip(self), err, name = "CountAggregator::recompute")]
    async fn process(&self, category: CountCategory) -> Result<u64, StoreError> {
        let rebuild: CountRebuild = tally;
        let started = Instant::now();
        let rows = self.store.rebuild_counts(category, rebuild).await?;
        info!(
            %category,
            rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Count category rebuilt"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::entities::LocationTable;
    use crate::processors::ingestor::ApplyMode;
    use crate::processors::location_tracker::LocationTracker;
    use crate::testing::{block, memory_ingestor, reveal, transfer};

    #[tokio::test]
    async fn recount_scenario() {
        let (store, ingestor) = memory_ingestor(IngestConfig::LEDGER_ONLY);
        ingestor
            .apply_block(
                &block(
                    775_617,
                    vec![
                        reveal(1, 0, "text/plain;charset=utf-8", 0, Some("a")),
                        reveal(2, 1, "image/png", 1, Some("b")),
                    ],
                ),
                ApplyMode::Forward,
            )
            .await
            .unwrap();
        let aggregator = CountAggregator::new(store.clone());

        assert_eq!(store.count_of(CountCategory::MimeType, "image/png").await, 0);
        assert_eq!(store.count_of(CountCategory::Type, "blessed").await, 0);

        aggregator.process(CountCategory::MimeType).await.unwrap();
        assert_eq!(store.count_of(CountCategory::MimeType, "image/png").await, 1);
        assert_eq!(store.count_of(CountCategory::MimeType, "text/plain").await, 1);
        assert_eq!(store.count_of(CountCategory::Type, "blessed").await, 0);

        aggregator.process(CountCategory::Type).await.unwrap();
        assert_eq!(store.count_of(CountCategory::Type, "blessed").await, 2);

        aggregator.process(CountCategory::SatRarity).await.unwrap();
        assert_eq!(store.count_of(CountCategory::SatRarity, "common").await, 2);
    }

    #[tokio::test]
    async fn recount_matches_incremental_counts() {
        let (store, ingestor) = memory_ingestor(IngestConfig::default());
        let blocks = [
            block(
                100,
                vec![
                    reveal(1, 0, "text/plain", 0, Some("a")),
                    reveal(2, -1, "image/png", 1, Some("a")),
                    reveal(3, 2, "text/html;charset=utf-8", 2, None),
                ],
            ),
            block(101, vec![transfer(1, 1, 9, 0, Some("b"))]),
            block(102, vec![transfer(2, 2, 8, 0, None), transfer(1, 9, 7, 3, Some("c"))]),
        ];
        for b in &blocks {
            ingestor.apply_block(b, ApplyMode::Forward).await.unwrap();
        }
        let incremental = store.snapshot().await;

        let aggregator = CountAggregator::new(store.clone());
        for category in CountCategory::ALL {
            aggregator.process(category).await.unwrap();
        }
        assert_eq!(store.snapshot().await.counts, incremental.counts);
        assert_eq!(store.count_of(CountCategory::Type, "cursed").await, 1);
        assert_eq!(store.count_of(CountCategory::Address, "c").await, 1);
        assert_eq!(store.count_of(CountCategory::Address, "a").await, 0);
        assert_eq!(store.count_of(CountCategory::GenesisAddress, "a").await, 2);
    }

    #[tokio::test]
    async fn targeted_recount_leaves_other_categories_alone() {
        let (store, ingestor) = memory_ingestor(IngestConfig::default());
        ingestor
            .apply_block(&block(100, vec![reveal(1, 0, "text/plain", 0, Some("a"))]), ApplyMode::Forward)
            .await
            .unwrap();
        // Wipe the location tables so address keys lose their source.
        store
            .rebuild_locations(LocationTable::Current, |_| Vec::new())
            .await
            .unwrap();

        CountAggregator::new(store.clone())
            .process(CountCategory::Address)
            .await
            .unwrap();
        assert_eq!(store.count_of(CountCategory::Address, "a").await, 0);
        assert_eq!(store.count_of(CountCategory::GenesisAddress, "a").await, 1);
        assert_eq!(store.count_of(CountCategory::MimeType, "text/plain").await, 1);

        LocationTracker::new(store.clone())
            .process(LocationTable::Current)
            .await
            .unwrap();
        CountAggregator::new(store.clone())
            .process(CountCategory::Address)
            .await
            .unwrap();
        assert_eq!(store.count_of(CountCategory::Address, "a").await, 1);
    }
}
