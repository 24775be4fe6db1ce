use crate::derive::counts::InscriptionFacts;
use crate::entities::counts::CountRecord;
use crate::entities::inscriptions::InscriptionRecord;
use crate::entities::locations::LocationEvent;
use crate::entities::{CountCategory, EventKey, LocationEventKind, LocationTable};
use crate::store::{
    BlockCommit, BlockWrite, CountRebuild, InscriptionState, InscriptionStore, LocationRebuild,
    StoreError, pair_states, sort_counts,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    inscriptions: BTreeMap<String, InscriptionRecord>,
    /// Keyed like the ledger's primary key.
    events: BTreeMap<(String, EventKey, LocationEventKind), LocationEvent>,
    genesis: BTreeMap<String, LocationEvent>,
    current: BTreeMap<String, LocationEvent>,
    counts: BTreeMap<(CountCategory, String), i64>,
    tip: Option<u64>,
}

impl Tables {
    fn derived_mut(&mut self, table: LocationTable) -> &mut BTreeMap<String, LocationEvent> {
        match table {
            LocationTable::Genesis => &mut self.genesis,
            LocationTable::Current => &mut self.current,
        }
    }

    fn derived(&self, table: LocationTable) -> &BTreeMap<String, LocationEvent> {
        match table {
            LocationTable::Genesis => &self.genesis,
            LocationTable::Current => &self.current,
        }
    }

    fn apply_count(&mut self, record: CountRecord) {
        let slot = (record.category, record.key);
        let count = self.counts.get(&slot).copied().unwrap_or(0) + record.count;
        if count > 0 {
            self.counts.insert(slot, count);
        } else {
            self.counts.remove(&slot);
        }
    }
}

/// Contents of the derived tables and chain tip, for comparing two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedSnapshot {
    pub genesis: BTreeMap<String, LocationEvent>,
    pub current: BTreeMap<String, LocationEvent>,
    pub counts: BTreeMap<(CountCategory, String), i64>,
    pub tip: Option<u64>,
    pub inscriptions: usize,
    pub events: usize,
}

/// In-process backend with the same table semantics as Postgres.
///
/// Every write holds the table lock for its whole duration, which gives
/// the same all-or-nothing behavior as a database transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing the backend: every call fails until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> DerivedSnapshot {
        let tables = self.tables.read().await;
        DerivedSnapshot {
            genesis: tables.genesis.clone(),
            current: tables.current.clone(),
            counts: tables.counts.clone(),
            tip: tables.tip,
            inscriptions: tables.inscriptions.len(),
            events: tables.events.len(),
        }
    }

    /// Count of one `(category, key)`, zero when absent.
    pub async fn count_of(&self, category: CountCategory, key: &str) -> i64 {
        let tables = self.tables.read().await;
        tables
            .counts
            .get(&(category, key.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl InscriptionStore for MemoryStore {
    async fn chain_tip(&self) -> Result<Option<u64>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.tip)
    }

    async fn load_states(
        &self,
        inscription_ids: &[String],
    ) -> Result<HashMap<String, InscriptionState>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut reveals: HashMap<String, LocationEvent> = HashMap::new();
        let mut latest: HashMap<String, LocationEvent> = HashMap::new();
        for event in tables.events.values() {
            if !inscription_ids.contains(&event.inscription_id) {
                continue;
            }
            if event.kind == LocationEventKind::Reveal
                && reveals
                    .get(&event.inscription_id)
                    .is_none_or(|r| event.order() < r.order())
            {
                reveals.insert(event.inscription_id.clone(), event.clone());
            }
            if latest
                .get(&event.inscription_id)
                .is_none_or(|l| event.order() > l.order())
            {
                latest.insert(event.inscription_id.clone(), event.clone());
            }
        }
        Ok(pair_states(
            reveals.into_values().collect(),
            latest.into_values().collect(),
        ))
    }

    async fn commit_block(&self, write: BlockWrite) -> Result<BlockCommit, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let mut commit = BlockCommit::default();

        for record in write.inscriptions {
            if !tables.inscriptions.contains_key(&record.id) {
                tables.inscriptions.insert(record.id.clone(), record);
                commit.inscriptions_inserted += 1;
            }
        }
        for event in write.events {
            let key = (event.inscription_id.clone(), event.key, event.kind);
            if !tables.events.contains_key(&key) {
                tables.events.insert(key, event);
                commit.events_inserted += 1;
            }
        }
        for row in write.genesis {
            tables.genesis.entry(row.inscription_id.clone()).or_insert(row);
        }
        for row in write.current {
            let later = tables
                .current
                .get(&row.inscription_id)
                .is_none_or(|existing| row.order() > existing.order());
            if later {
                tables.current.insert(row.inscription_id.clone(), row);
            }
        }
        for record in write.counts {
            tables.apply_count(record);
        }
        tables.tip = Some(tables.tip.map_or(write.height, |tip| tip.max(write.height)));
        Ok(commit)
    }

    async fn rebuild_locations(
        &self,
        table: LocationTable,
        rebuild: LocationRebuild,
    ) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let mut history: Vec<LocationEvent> = tables.events.values().cloned().collect();
        history.sort_by(|a, b| {
            a.order()
                .cmp(&b.order())
                .then_with(|| a.inscription_id.cmp(&b.inscription_id))
        });
        let rows = rebuild(history);
        let written = rows.len() as u64;
        let derived = tables.derived_mut(table);
        derived.clear();
        derived.extend(rows.into_iter().map(|row| (row.inscription_id.clone(), row)));
        Ok(written)
    }

    async fn rebuild_counts(
        &self,
        category: CountCategory,
        rebuild: CountRebuild,
    ) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let facts: Vec<InscriptionFacts> = tables
            .inscriptions
            .values()
            .map(|record| InscriptionFacts {
                mime_type: record.mime_type().to_string(),
                sat_rarity: record.sat_rarity(),
                inscription_type: record.inscription_type,
                genesis_address: tables
                    .genesis
                    .get(&record.id)
                    .and_then(|l| l.address.clone()),
                current_address: tables
                    .current
                    .get(&record.id)
                    .and_then(|l| l.address.clone()),
            })
            .collect();
        let records = rebuild(category, facts);
        tables.counts.retain(|(c, _), _| *c != category);
        let mut written = 0;
        for record in records {
            tables.apply_count(record);
            written += 1;
        }
        Ok(written)
    }

    async fn inscription(&self, id: &str) -> Result<Option<InscriptionRecord>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.inscriptions.get(id).cloned())
    }

    async fn location(
        &self,
        table: LocationTable,
        inscription_id: &str,
    ) -> Result<Option<LocationEvent>, StoreError> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .await
            .derived(table)
            .get(inscription_id)
            .cloned())
    }

    async fn counts(&self, category: CountCategory) -> Result<Vec<CountRecord>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut records: Vec<CountRecord> = tables
            .counts
            .iter()
            .filter(|((c, _), _)| *c == category)
            .map(|((category, key), count)| CountRecord {
                category: *category,
                key: key.clone(),
                count: *count,
            })
            .collect();
        sort_counts(&mut records);
        Ok(records)
    }
}
