//! Storage for the ledger and derived tables.
//!
//! [`InscriptionStore`] is the seam between the processors and a concrete
//! backend. [`PgStore`] is the production backend; [`MemoryStore`] keeps the
//! same tables in process for tests and database-less development.
//!
//! Every write method is one atomic unit: a block commit or a single table
//! rebuild either lands completely or not at all.

mod memory;
mod postgres;

pub use memory::{DerivedSnapshot, MemoryStore};
pub use postgres::PgStore;

use crate::derive::counts::InscriptionFacts;
use crate::entities::counts::CountRecord;
use crate::entities::inscriptions::InscriptionRecord;
use crate::entities::locations::LocationEvent;
use crate::entities::{CountCategory, LocationTable};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Computes a whole derived location table from the ledger.
pub type LocationRebuild = fn(Vec<LocationEvent>) -> Vec<LocationEvent>;

/// Computes the whole count table of one category.
pub type CountRebuild = fn(CountCategory, Vec<InscriptionFacts>) -> Vec<CountRecord>;

/// What the ledger already knows about one inscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InscriptionState {
    /// The reveal that created it.
    pub genesis: LocationEvent,
    /// Its latest event in chain order.
    pub current: LocationEvent,
}

/// Everything one block writes, committed in a single transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockWrite {
    pub height: u64,
    pub inscriptions: Vec<InscriptionRecord>,
    /// Ledger events in block order.
    pub events: Vec<LocationEvent>,
    /// New genesis rows; existing rows are kept.
    pub genesis: Vec<LocationEvent>,
    /// Current rows, at most one per inscription; applied only where later
    /// than the stored row.
    pub current: Vec<LocationEvent>,
    /// Signed count deltas, at most one per `(category, key)`.
    pub counts: Vec<CountRecord>,
}

/// Rows actually inserted by a block commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCommit {
    pub inscriptions_inserted: u64,
    pub events_inserted: u64,
}

#[async_trait]
pub trait InscriptionStore: Send + Sync {
    /// Highest fully ingested block height.
    async fn chain_tip(&self) -> Result<Option<u64>, StoreError>;

    /// Ledger state of the given inscriptions. Unknown ids are absent from
    /// the result.
    async fn load_states(
        &self,
        inscription_ids: &[String],
    ) -> Result<HashMap<String, InscriptionState>, StoreError>;

    /// Write one block and raise the chain tip to its height.
    async fn commit_block(&self, write: BlockWrite) -> Result<BlockCommit, StoreError>;

    /// Read the full ledger and replace `table` with `rebuild(ledger)`.
    ///
    /// Returns the number of rows written.
    async fn rebuild_locations(
        &self,
        table: LocationTable,
        rebuild: LocationRebuild,
    ) -> Result<u64, StoreError>;

    /// Read every inscription's facts and replace the rows of `category`
    /// with `rebuild(category, facts)`. Other categories are untouched.
    ///
    /// Returns the number of rows written.
    async fn rebuild_counts(
        &self,
        category: CountCategory,
        rebuild: CountRebuild,
    ) -> Result<u64, StoreError>;

    async fn inscription(&self, id: &str) -> Result<Option<InscriptionRecord>, StoreError>;

    async fn location(
        &self,
        table: LocationTable,
        inscription_id: &str,
    ) -> Result<Option<LocationEvent>, StoreError>;

    /// Count entries of one category, largest first.
    async fn counts(&self, category: CountCategory) -> Result<Vec<CountRecord>, StoreError>;
}

/// Pair reveal and latest events by inscription id.
pub(crate) fn pair_states(
    reveals: Vec<LocationEvent>,
    latest: Vec<LocationEvent>,
) -> HashMap<String, InscriptionState> {
    let mut latest: HashMap<String, LocationEvent> = latest
        .into_iter()
        .map(|event| (event.inscription_id.clone(), event))
        .collect();
    reveals
        .into_iter()
        .map(|genesis| {
            let current = latest
                .remove(&genesis.inscription_id)
                .unwrap_or_else(|| genesis.clone());
            (
                genesis.inscription_id.clone(),
                InscriptionState { genesis, current },
            )
        })
        .collect()
}

/// Sort count entries the way the read API presents them.
pub(crate) fn sort_counts(records: &mut [CountRecord]) {
    records.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
}
