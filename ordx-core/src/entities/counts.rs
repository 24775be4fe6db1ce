use crate::derive::counts::InscriptionFacts;
use crate::entities::{CountCategory, InscriptionType, column_parse, column_u64};
use crate::framework::DatabaseProcessor;
use crate::ordinals::{Sat, normalize_mime_type};
use kanau::processor::Processor;

/// One `(category, key) -> count` entry of `inscription_counts`.
///
/// Also used as a signed delta when blocks are applied incrementally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CountRecord {
    pub category: CountCategory,
    pub key: String,
    pub count: i64,
}

#[derive(sqlx::FromRow)]
struct CountRow {
    category: String,
    key: String,
    count: i64,
}

impl TryFrom<CountRow> for CountRecord {
    type Error = sqlx::Error;

    fn try_from(row: CountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            category: column_parse(&row.category, "category")?,
            key: row.key,
            count: row.count,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FactsRow {
    content_type: String,
    sat_ordinal: i64,
    inscription_type: InscriptionType,
    genesis_address: Option<String>,
    current_address: Option<String>,
}

impl CountRecord {
    /// Add signed deltas to existing counts, creating missing keys, and drop
    /// entries that reach zero.
    pub async fn apply_deltas_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        deltas: &[CountRecord],
    ) -> Result<u64, sqlx::Error> {
        if deltas.is_empty() {
            return Ok(0);
        }
        let categories: Vec<String> = deltas.iter().map(|d| d.category.to_string()).collect();
        let keys: Vec<String> = deltas.iter().map(|d| d.key.clone()).collect();
        let counts: Vec<i64> = deltas.iter().map(|d| d.count).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO inscription_counts AS c (category, key, count)
            SELECT * FROM UNNEST($1::text[], $2::text[], $3::bigint[])
            ON CONFLICT (category, key) DO UPDATE SET count = c.count + EXCLUDED.count
            "#,
        )
        .bind(&categories)
        .bind(&keys)
        .bind(&counts)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM inscription_counts
            WHERE category = ANY($1) AND count <= 0
            "#,
        )
        .bind(&categories)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Replace every row of one category.
    pub(crate) async fn replace_category_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        category: CountCategory,
        records: &[CountRecord],
    ) -> Result<u64, sqlx::Error> {
        sqlx::query("DELETE FROM inscription_counts WHERE category = $1")
            .bind(category.as_str())
            .execute(&mut **tx)
            .await?;
        Self::apply_deltas_tx(tx, records).await
    }

    pub(crate) async fn lock_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("LOCK TABLE inscription_counts IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Every inscription with the attributes its count keys derive from.
    pub(crate) async fn facts_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<Vec<InscriptionFacts>, sqlx::Error> {
        let rows = sqlx::query_as::<_, FactsRow>(
            r#"
            SELECT
                i.content_type,
                i.sat_ordinal,
                i.inscription_type,
                g.address AS genesis_address,
                c.address AS current_address
            FROM inscriptions i
            LEFT JOIN genesis_locations g ON g.inscription_id = i.id
            LEFT JOIN current_locations c ON c.inscription_id = i.id
            "#,
        )
        .fetch_all(&mut **tx)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(InscriptionFacts {
                    mime_type: normalize_mime_type(&row.content_type).to_string(),
                    sat_rarity: Sat(column_u64(row.sat_ordinal, "sat_ordinal")?).rarity(),
                    inscription_type: row.inscription_type,
                    genesis_address: row.genesis_address,
                    current_address: row.current_address,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
/// All count entries of one category, largest first.
pub struct GetCounts {
    pub category: CountCategory,
}

impl Processor<GetCounts> for DatabaseProcessor {
    type Output = Vec<CountRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetCounts")]
    async fn process(&self, query: GetCounts) -> Result<Vec<CountRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT category, key, count
            FROM inscription_counts
            WHERE category = $1
            ORDER BY count DESC, key ASC
            "#,
        )
        .bind(query.category.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CountRecord::try_from).collect()
    }
}
