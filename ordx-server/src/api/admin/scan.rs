use axum::{extract::Query, extract::State, response::IntoResponse};
use ordx_core::jobs::JobKind;
use ordx_sdk::objects::admin::ScanBlocksQuery;

use crate::state::AppState;

use super::{AdminApiError, accept_job};

/// `POST /brc-20/scan` — replay `start_block..=end_block` through the ingestor.
pub async fn scan_blocks(
    state: State<AppState>,
    Query(query): Query<ScanBlocksQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    accept_job(
        &state,
        JobKind::Scan {
            start_block: query.start_block,
            end_block: query.end_block,
        },
    )
    .await
}
