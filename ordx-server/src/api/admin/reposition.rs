use axum::{extract::Query, extract::State, response::IntoResponse};
use ordx_core::jobs::JobKind;
use ordx_sdk::objects::admin::RepositionQuery;

use crate::state::AppState;

use super::{AdminApiError, accept_job};

/// `POST /inscriptions/reposition` — rebuild the genesis or current table.
pub async fn reposition(
    state: State<AppState>,
    Query(query): Query<RepositionQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    accept_job(&state, JobKind::Reposition(query.criteria.into())).await
}
