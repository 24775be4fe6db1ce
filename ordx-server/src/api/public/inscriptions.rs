use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use ordx_core::entities::LocationTable;
use ordx_sdk::objects::inscriptions::InscriptionResponse;

use super::{PublicApiError, location_response};
use crate::state::AppState;

/// `GET /inscriptions/{inscription_id}`
///
/// Locations come from the derived tables and are `null` until they have
/// been tracked or rebuilt.
pub(super) async fn get_inscription(
    state: State<AppState>,
    Path(inscription_id): Path<String>,
) -> Result<impl IntoResponse, PublicApiError> {
    let record = state
        .store
        .inscription(&inscription_id)
        .await?
        .ok_or(PublicApiError::NotFound("inscription not found"))?;
    let genesis = state
        .store
        .location(LocationTable::Genesis, &inscription_id)
        .await?;
    let current = state
        .store
        .location(LocationTable::Current, &inscription_id)
        .await?;

    Ok(Json(InscriptionResponse {
        mime_type: record.mime_type().to_string(),
        sat_rarity: record.sat_rarity().into(),
        inscription_type: record.inscription_type.into(),
        id: record.id,
        number: record.number,
        content_type: record.content_type,
        content_length: record.content_length,
        fee: record.fee,
        sat_ordinal: record.sat_ordinal,
        genesis_block_height: record.block_height,
        genesis_block_hash: record.block_hash,
        genesis_timestamp: record.timestamp,
        genesis: genesis.map(location_response),
        current: current.map(location_response),
    }))
}
