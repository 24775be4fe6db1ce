use crate::entities::column_u64;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

/// The single-row high-water-mark of fully ingested blocks.
pub struct ChainTip;

impl ChainTip {
    /// Raise the tip to `height`; never lowers it.
    pub async fn advance_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        height: u64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO chain_tip (id, block_height) VALUES (TRUE, $1)
            ON CONFLICT (id) DO UPDATE
            SET block_height = GREATEST(chain_tip.block_height, EXCLUDED.block_height)
            "#,
        )
        .bind(height as i64)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetChainTip;

impl Processor<GetChainTip> for DatabaseProcessor {
    type Output = Option<u64>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetChainTip")]
    async fn process(&self, _query: GetChainTip) -> Result<Option<u64>, sqlx::Error> {
        let height = sqlx::query_scalar::<_, i64>("SELECT block_height FROM chain_tip WHERE id")
            .fetch_optional(&self.pool)
            .await?;
        height.map(|h| column_u64(h, "block_height")).transpose()
    }
}
