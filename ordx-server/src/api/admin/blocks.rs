use axum::{Json, extract::State, response::IntoResponse};
use kanau::processor::Processor;
use ordx_core::processors::ingestor::{ApplyBlock, ApplyMode};
use ordx_sdk::objects::admin::IngestBlockResponse;
use ordx_sdk::objects::blocks::BlockEvents;

use crate::state::AppState;

use super::AdminApiError;

/// `POST /blocks` — apply one block synchronously, in chain-following mode.
///
/// A malformed block is rejected whole with `422`; nothing is written.
pub async fn push_block(
    state: State<AppState>,
    Json(block): Json<BlockEvents>,
) -> Result<impl IntoResponse, AdminApiError> {
    let height = block.height;
    let archived = state.block_archive.as_ref().map(|_| block.clone());

    let outcome = state
        .ingestor
        .process(ApplyBlock {
            block,
            mode: ApplyMode::Forward,
        })
        .await
        .map_err(|error| AdminApiError::Ingest { height, error })?;

    if let (Some(archive), Some(block)) = (state.block_archive.as_ref(), archived) {
        archive.insert(block).await;
    }
    Ok(Json(IngestBlockResponse::from(outcome)))
}
