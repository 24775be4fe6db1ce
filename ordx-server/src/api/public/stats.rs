use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use ordx_core::entities::CountCategory;
use ordx_sdk::objects::CountCriteria;
use ordx_sdk::objects::inscriptions::{CountEntry, CountsResponse};

use super::PublicApiError;
use crate::state::AppState;

/// `GET /stats/counts/{category}` — all entries, largest count first.
pub(super) async fn get_counts(
    state: State<AppState>,
    Path(category): Path<CountCriteria>,
) -> Result<impl IntoResponse, PublicApiError> {
    let records = state.store.counts(CountCategory::from(category)).await?;
    Ok(Json(CountsResponse {
        category,
        results: records
            .into_iter()
            .map(|record| CountEntry {
                key: record.key,
                count: record.count,
            })
            .collect(),
    }))
}
