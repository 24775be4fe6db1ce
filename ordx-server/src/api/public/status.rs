use axum::{Json, extract::State, response::IntoResponse};
use ordx_sdk::objects::inscriptions::StatusResponse;

use super::PublicApiError;
use crate::state::AppState;

/// `GET /` — server version and the highest ingested block.
pub(super) async fn get_status(state: State<AppState>) -> Result<impl IntoResponse, PublicApiError> {
    let block_height = state.store.chain_tip().await?;
    Ok(Json(StatusResponse {
        server_version: format!("ordx-server v{}", env!("CARGO_PKG_VERSION")),
        status: "ready".to_string(),
        block_height,
    }))
}
