use crate::entities::chain_tip::{ChainTip, GetChainTip};
use crate::entities::counts::{CountRecord, GetCounts};
use crate::entities::inscriptions::{GetInscription, InscriptionRecord};
use crate::entities::locations::{
    DerivedWrite, GetLatestEvents, GetLocation, GetRevealEvents, LocationEvent,
};
use crate::entities::{CountCategory, LocationTable};
use crate::framework::DatabaseProcessor;
use crate::store::{
    BlockCommit, BlockWrite, CountRebuild, InscriptionState, InscriptionStore, LocationRebuild,
    StoreError, pair_states,
};
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use std::collections::HashMap;

/// Postgres backend.
#[derive(Clone)]
pub struct PgStore {
    db: DatabaseProcessor,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            db: DatabaseProcessor { pool },
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db.pool
    }
}

#[async_trait]
impl InscriptionStore for PgStore {
    async fn chain_tip(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.db.process(GetChainTip).await?)
    }

    async fn load_states(
        &self,
        inscription_ids: &[String],
    ) -> Result<HashMap<String, InscriptionState>, StoreError> {
        let reveals = self
            .db
            .process(GetRevealEvents {
                inscription_ids: inscription_ids.to_vec(),
            })
            .await?;
        let latest = self
            .db
            .process(GetLatestEvents {
                inscription_ids: inscription_ids.to_vec(),
            })
            .await?;
        Ok(pair_states(reveals, latest))
    }

    #[tracing::instrument(skip_all, err, name = "SQL:CommitBlock", fields(height = write.height))]
    async fn commit_block(&self, write: BlockWrite) -> Result<BlockCommit, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        let inscriptions_inserted =
            InscriptionRecord::insert_many_tx(&mut tx, &write.inscriptions).await?;
        let events_inserted = LocationEvent::insert_events_tx(&mut tx, &write.events).await?;
        LocationEvent::write_derived_tx(
            &mut tx,
            LocationTable::Genesis,
            &write.genesis,
            DerivedWrite::KeepExisting,
        )
        .await?;
        LocationEvent::write_derived_tx(
            &mut tx,
            LocationTable::Current,
            &write.current,
            DerivedWrite::Advance,
        )
        .await?;
        CountRecord::apply_deltas_tx(&mut tx, &write.counts).await?;
        ChainTip::advance_tx(&mut tx, write.height).await?;
        tx.commit().await?;
        Ok(BlockCommit {
            inscriptions_inserted,
            events_inserted,
        })
    }

    #[tracing::instrument(skip(self, rebuild), err, name = "SQL:RebuildLocations")]
    async fn rebuild_locations(
        &self,
        table: LocationTable,
        rebuild: LocationRebuild,
    ) -> Result<u64, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        LocationEvent::lock_derived_tx(&mut tx, table).await?;
        let history = LocationEvent::history_tx(&mut tx).await?;
        let rows = rebuild(history);
        let written = LocationEvent::replace_derived_tx(&mut tx, table, &rows).await?;
        tx.commit().await?;
        Ok(written)
    }

    #[tracing::instrument(skip(self, rebuild), err, name = "SQL:RebuildCounts")]
    async fn rebuild_counts(
        &self,
        category: CountCategory,
        rebuild: CountRebuild,
    ) -> Result<u64, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        CountRecord::lock_tx(&mut tx).await?;
        let facts = CountRecord::facts_tx(&mut tx).await?;
        let records = rebuild(category, facts);
        let written = CountRecord::replace_category_tx(&mut tx, category, &records).await?;
        tx.commit().await?;
        Ok(written)
    }

    async fn inscription(&self, id: &str) -> Result<Option<InscriptionRecord>, StoreError> {
        Ok(self
            .db
            .process(GetInscription { id: id.to_string() })
            .await?)
    }

    async fn location(
        &self,
        table: LocationTable,
        inscription_id: &str,
    ) -> Result<Option<LocationEvent>, StoreError> {
        Ok(self
            .db
            .process(GetLocation {
                table,
                inscription_id: inscription_id.to_string(),
            })
            .await?)
    }

    async fn counts(&self, category: CountCategory) -> Result<Vec<CountRecord>, StoreError> {
        Ok(self.db.process(GetCounts { category }).await?)
    }
}
