//! Location ledger and the two derived location tables.
//!
//! `locations` holds every reveal and transfer ever applied. The derived
//! tables `genesis_locations` and `current_locations` hold one row per
//! inscription, shaped exactly like a ledger row: a location is the event
//! that put the inscription there.

use crate::entities::inscriptions::INSERT_CHUNK;
use crate::entities::{EventKey, LocationEventKind, LocationTable, column_u32, column_u64};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use sqlx::{Postgres, QueryBuilder};

/// One reveal or transfer of an inscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationEvent {
    pub inscription_id: String,
    pub kind: LocationEventKind,
    pub key: EventKey,
    pub block_hash: String,
    pub timestamp: i64,
    /// Canonical `txid:vout:offset`.
    pub satpoint: String,
    pub address: Option<String>,
    pub value: Option<u64>,
}

impl LocationEvent {
    /// Chain order, with a reveal sorting before a transfer at an equal key.
    pub fn order(&self) -> (EventKey, LocationEventKind) {
        (self.key, self.kind)
    }
}

const LOCATION_COLUMNS: &str = "inscription_id, kind, block_height, tx_index, input_index, \
     block_hash, timestamp, satpoint, address, value";

#[derive(sqlx::FromRow)]
struct LocationRow {
    inscription_id: String,
    kind: LocationEventKind,
    block_height: i64,
    tx_index: i32,
    input_index: i32,
    block_hash: String,
    timestamp: i64,
    satpoint: String,
    address: Option<String>,
    value: Option<i64>,
}

impl TryFrom<LocationRow> for LocationEvent {
    type Error = sqlx::Error;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            inscription_id: row.inscription_id,
            kind: row.kind,
            key: EventKey {
                block_height: column_u64(row.block_height, "block_height")?,
                tx_index: column_u32(row.tx_index, "tx_index")?,
                input_index: column_u32(row.input_index, "input_index")?,
            },
            block_hash: row.block_hash,
            timestamp: row.timestamp,
            satpoint: row.satpoint,
            address: row.address,
            value: row.value.map(|v| column_u64(v, "value")).transpose()?,
        })
    }
}

fn rows_into_events(rows: Vec<LocationRow>) -> Result<Vec<LocationEvent>, sqlx::Error> {
    rows.into_iter().map(LocationEvent::try_from).collect()
}

fn push_location_values<'a>(builder: &mut QueryBuilder<'a, Postgres>, rows: &[LocationEvent]) {
    builder.push_values(rows, |mut b, row| {
        b.push_bind(row.inscription_id.clone())
            .push_bind(row.kind)
            .push_bind(row.key.block_height as i64)
            .push_bind(row.key.tx_index as i32)
            .push_bind(row.key.input_index as i32)
            .push_bind(row.block_hash.clone())
            .push_bind(row.timestamp)
            .push_bind(row.satpoint.clone())
            .push_bind(row.address.clone())
            .push_bind(row.value.map(|v| v as i64));
    });
}

/// How a derived-table insert treats an existing row for the same inscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DerivedWrite {
    /// Keep the existing row.
    KeepExisting,
    /// Replace it only if the new row is later in chain order.
    Advance,
    /// Replace it unconditionally.
    Overwrite,
}

impl LocationEvent {
    /// Append events to the ledger. Events already present are ignored.
    pub async fn insert_events_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        events: &[LocationEvent],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for chunk in events.chunks(INSERT_CHUNK) {
            let mut query_builder = QueryBuilder::new("INSERT INTO locations (");
            query_builder.push(LOCATION_COLUMNS).push(") ");
            push_location_values(&mut query_builder, chunk);
            query_builder
                .push(" ON CONFLICT (inscription_id, block_height, tx_index, input_index, kind) DO NOTHING");
            inserted += query_builder
                .build()
                .execute(&mut **tx)
                .await?
                .rows_affected();
        }
        Ok(inserted)
    }

    /// Write derived rows. `rows` must hold at most one row per inscription.
    pub(crate) async fn write_derived_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        table: LocationTable,
        rows: &[LocationEvent],
        mode: DerivedWrite,
    ) -> Result<u64, sqlx::Error> {
        let mut written = 0;
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut query_builder = QueryBuilder::new("INSERT INTO ");
            query_builder
                .push(table.table_name())
                .push(" AS t (")
                .push(LOCATION_COLUMNS)
                .push(") ");
            push_location_values(&mut query_builder, chunk);
            match mode {
                DerivedWrite::KeepExisting => {
                    query_builder.push(" ON CONFLICT (inscription_id) DO NOTHING");
                }
                DerivedWrite::Advance | DerivedWrite::Overwrite => {
                    query_builder.push(
                        " ON CONFLICT (inscription_id) DO UPDATE SET \
                        kind = EXCLUDED.kind, block_height = EXCLUDED.block_height, \
                        tx_index = EXCLUDED.tx_index, input_index = EXCLUDED.input_index, \
                        block_hash = EXCLUDED.block_hash, timestamp = EXCLUDED.timestamp, \
                        satpoint = EXCLUDED.satpoint, address = EXCLUDED.address, \
                        value = EXCLUDED.value",
                    );
                    if mode == DerivedWrite::Advance {
                        query_builder.push(
                            " WHERE (EXCLUDED.block_height, EXCLUDED.tx_index, \
                            EXCLUDED.input_index, EXCLUDED.kind) > \
                            (t.block_height, t.tx_index, t.input_index, t.kind)",
                        );
                    }
                }
            }
            written += query_builder
                .build()
                .execute(&mut **tx)
                .await?
                .rows_affected();
        }
        Ok(written)
    }

    /// Replace the whole derived table with `rows`.
    pub(crate) async fn replace_derived_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        table: LocationTable,
        rows: &[LocationEvent],
    ) -> Result<u64, sqlx::Error> {
        sqlx::query(&format!("DELETE FROM {}", table.table_name()))
            .execute(&mut **tx)
            .await?;
        Self::write_derived_tx(tx, table, rows, DerivedWrite::Overwrite).await
    }

    /// Conflicts with concurrent writers of the same table, so a block
    /// committed while a rebuild runs is either fully visible to it or
    /// applied on top of its result.
    pub(crate) async fn lock_derived_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        table: LocationTable,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "LOCK TABLE {} IN SHARE ROW EXCLUSIVE MODE",
            table.table_name()
        ))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// The full ledger in chain order.
    pub(crate) async fn history_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<Vec<LocationEvent>, sqlx::Error> {
        let rows = sqlx::query_as::<_, LocationRow>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations \
             ORDER BY block_height, tx_index, input_index, kind, inscription_id"
        ))
        .fetch_all(&mut **tx)
        .await?;
        rows_into_events(rows)
    }
}

#[derive(Debug, Clone)]
/// Ledger reveal events for a set of inscriptions.
pub struct GetRevealEvents {
    pub inscription_ids: Vec<String>,
}

impl Processor<GetRevealEvents> for DatabaseProcessor {
    type Output = Vec<LocationEvent>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetRevealEvents")]
    async fn process(&self, query: GetRevealEvents) -> Result<Vec<LocationEvent>, sqlx::Error> {
        if query.inscription_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, LocationRow>(&format!(
            "SELECT DISTINCT ON (inscription_id) {LOCATION_COLUMNS} FROM locations \
             WHERE inscription_id = ANY($1) AND kind = 'reveal' \
             ORDER BY inscription_id, block_height, tx_index, input_index"
        ))
        .bind(&query.inscription_ids)
        .fetch_all(&self.pool)
        .await?;
        rows_into_events(rows)
    }
}

#[derive(Debug, Clone)]
/// The latest ledger event of each of a set of inscriptions, in chain order.
pub struct GetLatestEvents {
    pub inscription_ids: Vec<String>,
}

impl Processor<GetLatestEvents> for DatabaseProcessor {
    type Output = Vec<LocationEvent>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetLatestEvents")]
    async fn process(&self, query: GetLatestEvents) -> Result<Vec<LocationEvent>, sqlx::Error> {
        if query.inscription_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, LocationRow>(&format!(
            "SELECT DISTINCT ON (inscription_id) {LOCATION_COLUMNS} FROM locations \
             WHERE inscription_id = ANY($1) \
             ORDER BY inscription_id, block_height DESC, tx_index DESC, input_index DESC, kind DESC"
        ))
        .bind(&query.inscription_ids)
        .fetch_all(&self.pool)
        .await?;
        rows_into_events(rows)
    }
}

#[derive(Debug, Clone)]
/// Derived location row of one inscription.
pub struct GetLocation {
    pub table: LocationTable,
    pub inscription_id: String,
}

impl Processor<GetLocation> for DatabaseProcessor {
    type Output = Option<LocationEvent>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetLocation")]
    async fn process(&self, query: GetLocation) -> Result<Option<LocationEvent>, sqlx::Error> {
        let row = sqlx::query_as::<_, LocationRow>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM {} WHERE inscription_id = $1",
            query.table.table_name()
        ))
        .bind(query.inscription_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(LocationEvent::try_from).transpose()
    }
}
