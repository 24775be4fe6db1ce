//! Public read API handlers.
//!
//! # Endpoints
//!
//! - `GET /`                         – server status and chain tip
//! - `GET /inscriptions/{id}`        – inscription with both locations
//! - `GET /sats/{ordinal}`           – sat rarity and coinbase position
//! - `GET /stats/counts/{category}`  – count entries of one category

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use ordx_core::entities::locations::LocationEvent;
use ordx_core::store::StoreError;
use ordx_sdk::objects::inscriptions::LocationResponse;

use crate::state::AppState;

mod inscriptions;
mod sats;
mod stats;
mod status;

/// Build the public read API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(status::get_status))
        .route("/inscriptions/{inscription_id}", get(inscriptions::get_inscription))
        .route("/sats/{ordinal}", get(sats::get_sat))
        .route("/stats/counts/{category}", get(stats::get_counts))
}

fn location_response(event: LocationEvent) -> LocationResponse {
    LocationResponse {
        satpoint: event.satpoint,
        address: event.address,
        value: event.value,
        block_height: event.key.block_height,
        tx_index: event.key.tx_index,
        timestamp: event.timestamp,
    }
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum PublicApiError {
    Store(StoreError),
    NotFound(&'static str),
}

impl From<StoreError> for PublicApiError {
    fn from(value: StoreError) -> Self {
        PublicApiError::Store(value)
    }
}

impl IntoResponse for PublicApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            PublicApiError::Store(e) => {
                tracing::error!(error = %e, "Public API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            PublicApiError::NotFound(what) => (StatusCode::NOT_FOUND, what).into_response(),
        }
    }
}
