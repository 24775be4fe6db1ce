use axum::{Json, extract::Path, response::IntoResponse};
use ordx_core::ordinals::Sat;
use ordx_sdk::objects::inscriptions::SatResponse;

use super::PublicApiError;

/// `GET /sats/{ordinal}`
pub(super) async fn get_sat(Path(ordinal): Path<u64>) -> Result<impl IntoResponse, PublicApiError> {
    let sat = Sat(ordinal);
    let (coinbase_height, offset) = sat
        .coinbase_position()
        .ok_or(PublicApiError::NotFound("ordinal is past the total supply"))?;
    Ok(Json(SatResponse {
        ordinal,
        rarity: sat.rarity().into(),
        coinbase_height,
        offset,
    }))
}
