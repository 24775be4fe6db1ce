use sqlx::PgPool;

/// Runs single SQL reads through `kanau::processor::Processor` impls.
///
/// Multi-statement writes go through `_tx` associated functions on the
/// entity types instead, composed inside one transaction by the store.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
