use crate::entities::{InscriptionType, column_u32, column_u64};
use crate::framework::DatabaseProcessor;
use crate::ordinals::{Rarity, Sat, normalize_mime_type};
use kanau::processor::Processor;

/// Rows per multi-row INSERT; keeps every statement well under the
/// Postgres limit of 65535 bind parameters.
pub(crate) const INSERT_CHUNK: usize = 1_000;

/// An inscription as revealed on chain. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InscriptionRecord {
    /// Canonical `<txid>i<index>`.
    pub id: String,
    pub number: i64,
    pub inscription_type: InscriptionType,
    pub content_type: String,
    pub content_length: u64,
    pub content: Vec<u8>,
    pub fee: u64,
    pub sat_ordinal: u64,
    pub block_height: u64,
    pub block_hash: String,
    pub tx_index: u32,
    pub timestamp: i64,
}

impl InscriptionRecord {
    pub fn mime_type(&self) -> &str {
        normalize_mime_type(&self.content_type)
    }

    pub fn sat_rarity(&self) -> Rarity {
        Sat(self.sat_ordinal).rarity()
    }
}

#[derive(sqlx::FromRow)]
struct InscriptionRow {
    id: String,
    number: i64,
    inscription_type: InscriptionType,
    content_type: String,
    content_length: i64,
    content: Vec<u8>,
    fee: i64,
    sat_ordinal: i64,
    block_height: i64,
    block_hash: String,
    tx_index: i32,
    timestamp: i64,
}

impl TryFrom<InscriptionRow> for InscriptionRecord {
    type Error = sqlx::Error;

    fn try_from(row: InscriptionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            number: row.number,
            inscription_type: row.inscription_type,
            content_type: row.content_type,
            content_length: column_u64(row.content_length, "content_length")?,
            content: row.content,
            fee: column_u64(row.fee, "fee")?,
            sat_ordinal: column_u64(row.sat_ordinal, "sat_ordinal")?,
            block_height: column_u64(row.block_height, "block_height")?,
            block_hash: row.block_hash,
            tx_index: column_u32(row.tx_index, "tx_index")?,
            timestamp: row.timestamp,
        })
    }
}

impl InscriptionRecord {
    /// Insert newly revealed inscriptions, ignoring ids that already exist.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn insert_many_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        records: &[InscriptionRecord],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for chunk in records.chunks(INSERT_CHUNK) {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO inscriptions \
                (id, number, inscription_type, content_type, content_length, content, fee, \
                sat_ordinal, block_height, block_hash, tx_index, timestamp) ",
            );
            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.id.clone())
                    .push_bind(record.number)
                    .push_bind(record.inscription_type)
                    .push_bind(record.content_type.clone())
                    .push_bind(record.content_length as i64)
                    .push_bind(record.content.clone())
                    .push_bind(record.fee as i64)
                    .push_bind(record.sat_ordinal as i64)
                    .push_bind(record.block_height as i64)
                    .push_bind(record.block_hash.clone())
                    .push_bind(record.tx_index as i32)
                    .push_bind(record.timestamp);
            });
            query_builder.push(" ON CONFLICT (id) DO NOTHING");
            inserted += query_builder
                .build()
                .execute(&mut **tx)
                .await?
                .rows_affected();
        }
        Ok(inserted)
    }
}

#[derive(Debug, Clone)]
/// Look up one inscription by its canonical id.
pub struct GetInscription {
    pub id: String,
}

impl Processor<GetInscription> for DatabaseProcessor {
    type Output = Option<InscriptionRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetInscription")]
    async fn process(&self, query: GetInscription) -> Result<Option<InscriptionRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, InscriptionRow>(
            r#"
            SELECT id, number, inscription_type, content_type, content_length, content, fee,
                   sat_ordinal, block_height, block_hash, tx_index, timestamp
            FROM inscriptions
            WHERE id = $1
            "#,
        )
        .bind(query.id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(InscriptionRecord::try_from).transpose()
    }
}
