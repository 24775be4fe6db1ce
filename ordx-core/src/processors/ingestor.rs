//! Event ingestor.
//!
//! Applies one block of reveal and transfer events at a time. A block is
//! validated and fully derived in memory by [`plan_block`] before anything
//! is written, then committed by the store in a single transaction: a
//! malformed event rejects the whole block and leaves storage untouched.
//!
//! The ingestor is the only writer of the ledger. Concurrent callers (the
//! sync runner, push ingestion and scan jobs) are serialized on an internal
//! lock so that state loaded for a block cannot go stale before it commits.

use crate::config::{ConfigStore, IngestConfig};
use crate::derive::counts::{CountDeltas, InscriptionFacts};
use crate::derive::locations::{Advance, advance};
use crate::entities::inscriptions::InscriptionRecord;
use crate::entities::locations::LocationEvent;
use crate::entities::{CountCategory, EventKey, InscriptionType, LocationEventKind};
use crate::ordinals::{InscriptionId, Sat, SatPoint, decode_content, normalize_mime_type};
use crate::store::{BlockWrite, InscriptionState, InscriptionStore, StoreError};
use itertools::Itertools;
use kanau::processor::Processor;
use ordx_sdk::objects::admin::{IngestBlockResponse, IngestOutcome};
use ordx_sdk::objects::blocks::{BlockEvents, InscriptionEvent, RevealEvent, TransferEvent};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Public data types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Normal chain following: blocks at or below the chain tip are skipped.
    Forward,
    /// Re-walk every block; rows that already exist are left alone.
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub height: u64,
    pub outcome: IngestOutcome,
    pub inscriptions_revealed: u64,
    pub transfers_recorded: u64,
}

impl From<ApplyOutcome> for IngestBlockResponse {
    fn from(value: ApplyOutcome) -> Self {
        Self {
            height: value.height,
            outcome: value.outcome,
            inscriptions_revealed: value.inscriptions_revealed,
            transfers_recorded: value.transfers_recorded,
        }
    }
}

/// Input for the `Processor` impl.
#[derive(Debug, Clone)]
pub struct ApplyBlock {
    pub block: BlockEvents,
    pub mode: ApplyMode,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("block {height}: transfer of unknown inscription {inscription_id}")]
    UnknownInscription { height: u64, inscription_id: String },

    #[error("block {height}: inscription {inscription_id} already has a genesis")]
    DuplicateGenesis { height: u64, inscription_id: String },

    #[error("block {height}: event at tx index {tx_index} follows tx index {previous}")]
    OutOfOrder {
        height: u64,
        tx_index: u32,
        previous: u32,
    },

    #[error("block {height}: {reason}")]
    InvalidEvent { height: u64, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::UnknownInscription { .. } => "unknown_inscription",
            IngestError::DuplicateGenesis { .. } => "duplicate_genesis",
            IngestError::OutOfOrder { .. } => "out_of_order",
            IngestError::InvalidEvent { .. } => "invalid_event",
            IngestError::Store(_) => "storage",
        }
    }

    /// Whether the block itself is at fault, as opposed to the storage.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, IngestError::Store(_))
    }
}

/// Fully derived write set of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    pub write: BlockWrite,
    pub inscriptions_revealed: u64,
    pub transfers_recorded: u64,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

fn invalid(height: u64, reason: impl ToString) -> IngestError {
    IngestError::InvalidEvent {
        height,
        reason: reason.to_string(),
    }
}

fn canonical_id(height: u64, raw: &str) -> Result<String, IngestError> {
    raw.parse::<InscriptionId>()
        .map(|id| id.to_string())
        .map_err(|e| invalid(height, e))
}

fn canonical_satpoint(height: u64, raw: &str) -> Result<String, IngestError> {
    raw.parse::<SatPoint>()
        .map(|sp| sp.to_string())
        .map_err(|e| invalid(height, e))
}

/// Canonical ids of every inscription the block touches, deduplicated.
pub fn referenced_ids(block: &BlockEvents) -> Result<Vec<String>, IngestError> {
    block
        .events
        .iter()
        .map(|event| canonical_id(block.height, event.inscription_id()))
        .collect::<Result<Vec<_>, _>>()
        .map(|ids| ids.into_iter().unique().collect())
}

/// Working state of one inscription while walking a block.
struct Tracked {
    genesis_key: EventKey,
    current: Option<LocationEvent>,
}

struct Planner<'a> {
    block: &'a BlockEvents,
    options: IngestConfig,
    tracked: HashMap<String, Tracked>,
    revealed_here: HashSet<String>,
    moved: Vec<String>,
    deltas: CountDeltas,
    plan: BlockPlan,
}

impl<'a> Planner<'a> {
    fn new(
        block: &'a BlockEvents,
        states: &HashMap<String, InscriptionState>,
        options: IngestConfig,
    ) -> Self {
        let tracked = states
            .iter()
            .map(|(id, state)| {
                (
                    id.clone(),
                    Tracked {
                        genesis_key: state.genesis.key,
                        current: Some(state.current.clone()),
                    },
                )
            })
            .collect();
        Self {
            block,
            options,
            tracked,
            revealed_here: HashSet::new(),
            moved: Vec::new(),
            deltas: CountDeltas::default(),
            plan: BlockPlan {
                write: BlockWrite {
                    height: block.height,
                    ..BlockWrite::default()
                },
                inscriptions_revealed: 0,
                transfers_recorded: 0,
            },
        }
    }

    fn tracks_addresses(&self) -> bool {
        self.options.track_counts && self.options.track_locations
    }

    /// Fold `location` into its inscription's current location and account
    /// for the address move.
    fn place(&mut self, location: &LocationEvent) {
        let tracks_addresses = self.tracks_addresses();
        let Some(tracked) = self.tracked.get_mut(&location.inscription_id) else {
            return;
        };
        let Advance::Moved { previous } = advance(&mut tracked.current, location) else {
            return;
        };
        self.moved.push(location.inscription_id.clone());
        if tracks_addresses {
            if let Some(address) = previous.and_then(|p| p.address) {
                self.deltas.add(CountCategory::Address, address, -1);
            }
            if let Some(address) = &location.address {
                self.deltas.add(CountCategory::Address, address.clone(), 1);
            }
        }
    }

    fn reveal(&mut self, reveal: &RevealEvent) -> Result<(), IngestError> {
        let height = self.block.height;
        let id = canonical_id(height, &reveal.inscription_id)?;
        let satpoint = canonical_satpoint(height, &reveal.satpoint_post_inscription)?;
        let content = decode_content(&reveal.content_bytes)
            .map_err(|e| invalid(height, format!("content of {id}: {e}")))?;
        let sat = Sat(reveal.ordinal_number);
        if !sat.is_valid() {
            return Err(invalid(height, format!("sat {} is beyond supply", sat.0)));
        }
        let key = EventKey::new(height, reveal.tx_index, reveal.inscription_input_index);

        if !self.revealed_here.insert(id.clone()) {
            return Err(IngestError::DuplicateGenesis {
                height,
                inscription_id: id,
            });
        }
        if let Some(tracked) = self.tracked.get(&id) {
            if tracked.genesis_key == key {
                debug!(inscription_id = %id, "Reveal already ingested");
                return Ok(());
            }
            return Err(IngestError::DuplicateGenesis {
                height,
                inscription_id: id,
            });
        }

        let record = InscriptionRecord {
            id: id.clone(),
            number: reveal.inscription_number,
            inscription_type: InscriptionType::from_number(reveal.inscription_number),
            content_type: reveal.content_type.clone(),
            content_length: reveal.content_length,
            content,
            fee: reveal.inscription_fee,
            sat_ordinal: sat.0,
            block_height: height,
            block_hash: self.block.hash.clone(),
            tx_index: reveal.tx_index,
            timestamp: self.block.timestamp,
        };
        let location = LocationEvent {
            inscription_id: id.clone(),
            kind: LocationEventKind::Reveal,
            key,
            block_hash: self.block.hash.clone(),
            timestamp: self.block.timestamp,
            satpoint,
            address: reveal.inscriber_address.clone(),
            value: Some(reveal.inscription_output_value),
        };

        if self.options.track_counts {
            let facts = InscriptionFacts {
                mime_type: normalize_mime_type(&record.content_type).to_string(),
                sat_rarity: sat.rarity(),
                inscription_type: record.inscription_type,
                genesis_address: location.address.clone(),
                current_address: None,
            };
            let mut categories = vec![
                CountCategory::MimeType,
                CountCategory::SatRarity,
                CountCategory::Type,
            ];
            if self.options.track_locations {
                categories.push(CountCategory::GenesisAddress);
            }
            self.deltas.add_facts(&categories, &facts, 1);
        }
        if self.options.track_locations {
            self.plan.write.genesis.push(location.clone());
        }

        self.tracked.insert(
            id,
            Tracked {
                genesis_key: key,
                current: None,
            },
        );
        self.place(&location);
        self.plan.write.inscriptions.push(record);
        self.plan.write.events.push(location);
        self.plan.inscriptions_revealed += 1;
        Ok(())
    }

    fn transfer(&mut self, transfer: &TransferEvent) -> Result<(), IngestError> {
        let height = self.block.height;
        let id = canonical_id(height, &transfer.inscription_id)?;
        canonical_satpoint(height, &transfer.satpoint_pre_transfer)?;
        let satpoint = canonical_satpoint(height, &transfer.satpoint_post_transfer)?;
        if !self.tracked.contains_key(&id) {
            return Err(IngestError::UnknownInscription {
                height,
                inscription_id: id,
            });
        }

        let location = LocationEvent {
            inscription_id: id,
            kind: LocationEventKind::Transfer,
            key: EventKey::new(height, transfer.tx_index, transfer.input_index),
            block_hash: self.block.hash.clone(),
            timestamp: self.block.timestamp,
            satpoint,
            address: transfer.destination_address.clone(),
            value: transfer.post_transfer_output_value,
        };
        self.place(&location);
        self.plan.write.events.push(location);
        self.plan.transfers_recorded += 1;
        Ok(())
    }

    fn finish(mut self) -> BlockPlan {
        if self.options.track_locations {
            let tracked = &self.tracked;
            self.plan.write.current = self
                .moved
                .iter()
                .unique()
                .filter_map(|id| tracked.get(id).and_then(|t| t.current.clone()))
                .collect();
        }
        self.plan.write.counts = self.deltas.into_records();
        self.plan
    }
}

/// Validate a block against the stored state of the inscriptions it touches
/// and derive everything it writes.
///
/// `states` must hold the state of every stored inscription the block
/// references (see [`referenced_ids`]).
pub fn plan_block(
    block: &BlockEvents,
    states: &HashMap<String, InscriptionState>,
    options: IngestConfig,
) -> Result<BlockPlan, IngestError> {
    let mut planner = Planner::new(block, states, options);
    let mut previous_tx = 0;
    for event in &block.events {
        let tx_index = event.tx_index();
        if tx_index < previous_tx {
            return Err(IngestError::OutOfOrder {
                height: block.height,
                tx_index,
                previous: previous_tx,
            });
        }
        previous_tx = tx_index;
        match event {
            InscriptionEvent::InscriptionRevealed(reveal) => planner.reveal(reveal)?,
            InscriptionEvent::InscriptionTransferred(transfer) => planner.transfer(transfer)?,
        }
    }
    Ok(planner.finish())
}

// ---------------------------------------------------------------------------
// EventIngestor
// ---------------------------------------------------------------------------

pub struct EventIngestor {
    store: Arc<dyn InscriptionStore>,
    config: ConfigStore<IngestConfig>,
    write_lock: Mutex<()>,
}

impl EventIngestor {
    pub fn new(store: Arc<dyn InscriptionStore>, config: ConfigStore<IngestConfig>) -> Self {
        Self {
            store,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn InscriptionStore> {
        &self.store
    }

    /// Apply one block atomically.
    #[tracing::instrument(skip_all, err, fields(height = block.height, mode = ?mode))]
    pub async fn apply_block(
        &self,
        block: &BlockEvents,
        mode: ApplyMode,
    ) -> Result<ApplyOutcome, IngestError> {
        let _guard = self.write_lock.lock().await;

        if mode == ApplyMode::Forward {
            let tip = self.store.chain_tip().await?;
            if tip.is_some_and(|tip| block.height <= tip) {
                debug!(?tip, "Block at or below chain tip, skipping");
                return Ok(ApplyOutcome {
                    height: block.height,
                    outcome: IngestOutcome::Skipped,
                    inscriptions_revealed: 0,
                    transfers_recorded: 0,
                });
            }
        }

        let options = *self.config.read().await;
        let ids = referenced_ids(block)?;
        let states = self.store.load_states(&ids).await?;
        let plan = plan_block(block, &states, options)?;
        let commit = self.store.commit_block(plan.write).await?;

        info!(
            revealed = plan.inscriptions_revealed,
            transfers = plan.transfers_recorded,
            inserted_inscriptions = commit.inscriptions_inserted,
            inserted_events = commit.events_inserted,
            "Block applied"
        );
        Ok(ApplyOutcome {
            height: block.height,
            outcome: IngestOutcome::Applied,
            inscriptions_revealed: plan.inscriptions_revealed,
            transfers_recorded: plan.transfers_recorded,
        })
    }
}

// ---------------------------------------------------------------------------
// Processor trait implementation
// ---------------------------------------------------------------------------

impl Processor<ApplyBlock> for EventIngestor {
    type Output = ApplyOutcome;
    type Error = IngestError;

    async fn process(&self, input: ApplyBlock) -> Result<ApplyOutcome, IngestError> {
        self.apply_block(&input.block, input.mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::LocationTable;
    use crate::processors::location_tracker::LocationTracker;
    use crate::testing::{block, inscription_id, memory_ingestor, reveal, satpoint, transfer};

    #[tokio::test]
    async fn reveal_then_transfers_track_locations_and_counts() {
        let (store, ingestor) = memory_ingestor(IngestConfig::default());

        let outcome = ingestor
            .apply_block(
                &block(
                    100,
                    vec![
                        reveal(1, 0, "text/plain;charset=utf-8", 0, Some("h0")),
                        reveal(2, 1, "image/png", 3, Some("h0")),
                    ],
                ),
                ApplyMode::Forward,
            )
            .await
            .unwrap();
        assert_eq!(outcome.outcome, IngestOutcome::Applied);
        assert_eq!(outcome.inscriptions_revealed, 2);

        ingestor
            .apply_block(&block(105, vec![transfer(1, 1, 7, 2, Some("h1"))]), ApplyMode::Forward)
            .await
            .unwrap();

        let id = inscription_id(1);
        let genesis = store.location(LocationTable::Genesis, &id).await.unwrap().unwrap();
        let current = store.location(LocationTable::Current, &id).await.unwrap().unwrap();
        assert_eq!(genesis.satpoint, satpoint(1));
        assert_eq!(genesis.address.as_deref(), Some("h0"));
        assert_eq!(current.satpoint, satpoint(7));
        assert_eq!(current.key.block_height, 105);

        assert_eq!(store.count_of(CountCategory::MimeType, "text/plain").await, 1);
        assert_eq!(store.count_of(CountCategory::MimeType, "image/png").await, 1);
        assert_eq!(store.count_of(CountCategory::Type, "blessed").await, 2);
        assert_eq!(store.count_of(CountCategory::SatRarity, "common").await, 2);
        assert_eq!(store.count_of(CountCategory::GenesisAddress, "h0").await, 2);
        assert_eq!(store.count_of(CountCategory::Address, "h0").await, 1);
        assert_eq!(store.count_of(CountCategory::Address, "h1").await, 1);
        assert_eq!(store.chain_tip().await.unwrap(), Some(105));
    }

    #[tokio::test]
    async fn forward_reapplication_is_a_no_op() {
        let (store, ingestor) = memory_ingestor(IngestConfig::default());
        let first = block(100, vec![reveal(1, 0, "text/plain", 0, Some("h0"))]);
        ingestor.apply_block(&first, ApplyMode::Forward).await.unwrap();
        let before = store.snapshot().await;

        let outcome = ingestor.apply_block(&first, ApplyMode::Forward).await.unwrap();
        assert_eq!(outcome.outcome, IngestOutcome::Skipped);
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn replay_leaves_state_unchanged() {
        let (store, ingestor) = memory_ingestor(IngestConfig::default());
        let blocks = [
            block(100, vec![reveal(1, 0, "text/plain", 0, Some("h0"))]),
            block(101, vec![transfer(1, 1, 2, 0, Some("h1"))]),
            block(102, vec![transfer(1, 2, 3, 5, Some("h2"))]),
        ];
        for b in &blocks {
            ingestor.apply_block(b, ApplyMode::Forward).await.unwrap();
        }
        let before = store.snapshot().await;

        for b in &blocks {
            let outcome = ingestor.apply_block(b, ApplyMode::Replay).await.unwrap();
            assert_eq!(outcome.outcome, IngestOutcome::Applied);
        }
        assert_eq!(store.snapshot().await, before);
        assert_eq!(store.count_of(CountCategory::Address, "h2").await, 1);
        assert_eq!(store.count_of(CountCategory::Address, "h0").await, 0);
    }

    #[tokio::test]
    async fn transfer_in_the_reveal_input_survives_replay_and_rebuild() {
        let (store, ingestor) = memory_ingestor(IngestConfig::default());
        let same_input = block(
            100,
            vec![
                reveal(1, 0, "text/plain", 0, Some("h0")),
                transfer(1, 1, 7, 0, Some("h1")),
            ],
        );
        ingestor.apply_block(&same_input, ApplyMode::Forward).await.unwrap();

        let id = inscription_id(1);
        let current = store.location(LocationTable::Current, &id).await.unwrap().unwrap();
        assert_eq!(current.satpoint, satpoint(7));
        let incremental = store.snapshot().await;
        assert_eq!(incremental.events, 2);
        assert_eq!(store.count_of(CountCategory::Address, "h0").await, 0);
        assert_eq!(store.count_of(CountCategory::Address, "h1").await, 1);

        ingestor.apply_block(&same_input, ApplyMode::Replay).await.unwrap();
        assert_eq!(store.snapshot().await, incremental);

        let tracker = LocationTracker::new(store.clone());
        tracker.process(LocationTable::Genesis).await.unwrap();
        tracker.process(LocationTable::Current).await.unwrap();
        assert_eq!(store.snapshot().await, incremental);
    }

    #[tokio::test]
    async fn unknown_transfer_rejects_the_whole_block() {
        let (store, ingestor) = memory_ingestor(IngestConfig::default());
        let bad = block(
            100,
            vec![
                reveal(1, 0, "text/plain", 0, Some("h0")),
                transfer(9, 9, 2, 1, Some("h1")),
            ],
        );
        let err = ingestor.apply_block(&bad, ApplyMode::Forward).await.unwrap_err();
        assert!(matches!(err, IngestError::UnknownInscription { height: 100, .. }));
        assert_eq!(err.code(), "unknown_inscription");
        assert!(err.is_malformed());

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.inscriptions, 0);
        assert_eq!(snapshot.events, 0);
        assert!(snapshot.counts.is_empty());
        assert_eq!(snapshot.tip, None);
    }

    #[tokio::test]
    async fn duplicate_genesis_is_rejected() {
        let (store, ingestor) = memory_ingestor(IngestConfig::default());

        let twice = block(
            100,
            vec![
                reveal(1, 0, "text/plain", 0, Some("h0")),
                reveal(1, 0, "text/plain", 0, Some("h0")),
            ],
        );
        let err = ingestor.apply_block(&twice, ApplyMode::Forward).await.unwrap_err();
        assert!(matches!(err, IngestError::DuplicateGenesis { .. }));
        assert_eq!(store.snapshot().await.inscriptions, 0);

        ingestor
            .apply_block(&block(100, vec![reveal(1, 0, "text/plain", 0, None)]), ApplyMode::Forward)
            .await
            .unwrap();
        let again = block(101, vec![reveal(1, 0, "text/plain", 4, None)]);
        let err = ingestor.apply_block(&again, ApplyMode::Forward).await.unwrap_err();
        assert_eq!(err.code(), "duplicate_genesis");
        assert_eq!(store.chain_tip().await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn events_must_be_in_tx_order() {
        let (_, ingestor) = memory_ingestor(IngestConfig::default());
        let shuffled = block(
            100,
            vec![
                reveal(1, 0, "text/plain", 5, None),
                reveal(2, 1, "text/plain", 2, None),
            ],
        );
        let err = ingestor.apply_block(&shuffled, ApplyMode::Forward).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::OutOfOrder {
                tx_index: 2,
                previous: 5,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn invalid_satpoint_is_malformed() {
        let (_, ingestor) = memory_ingestor(IngestConfig::default());
        let mut event = transfer(1, 1, 2, 0, None);
        if let InscriptionEvent::InscriptionTransferred(t) = &mut event {
            t.satpoint_post_transfer = "not-a-satpoint".to_string();
        }
        let bad = block(100, vec![reveal(1, 0, "text/plain", 0, None), event]);
        let err = ingestor.apply_block(&bad, ApplyMode::Forward).await.unwrap_err();
        assert_eq!(err.code(), "invalid_event");
    }

    #[tokio::test]
    async fn ledger_only_mode_leaves_derived_tables_empty() {
        let (store, ingestor) = memory_ingestor(IngestConfig::LEDGER_ONLY);
        ingestor
            .apply_block(
                &block(100, vec![reveal(1, 0, "text/plain", 0, Some("h0"))]),
                ApplyMode::Forward,
            )
            .await
            .unwrap();
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.inscriptions, 1);
        assert_eq!(snapshot.events, 1);
        assert!(snapshot.genesis.is_empty());
        assert!(snapshot.current.is_empty());
        assert!(snapshot.counts.is_empty());
        assert_eq!(snapshot.tip, Some(100));
    }

    #[test]
    fn plan_moves_each_inscription_once_per_block() {
        let b = block(
            100,
            vec![
                reveal(1, 0, "text/plain", 0, Some("h0")),
                transfer(1, 1, 2, 1, Some("h1")),
                transfer(1, 2, 3, 2, Some("h2")),
            ],
        );
        let plan = plan_block(&b, &HashMap::new(), IngestConfig::default()).unwrap();
        assert_eq!(plan.write.events.len(), 3);
        assert_eq!(plan.write.current.len(), 1);
        assert_eq!(plan.write.current[0].satpoint, satpoint(3));
        let address: Vec<_> = plan
            .write
            .counts
            .iter()
            .filter(|c| c.category == CountCategory::Address)
            .map(|c| (c.key.as_str(), c.count))
            .collect();
        assert_eq!(address, [("h2", 1)]);
    }
}
