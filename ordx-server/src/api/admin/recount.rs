use axum::{extract::Query, extract::State, response::IntoResponse};
use ordx_core::jobs::JobKind;
use ordx_sdk::objects::admin::RecountQuery;

use crate::state::AppState;

use super::{AdminApiError, accept_job};

/// `POST /inscriptions/recount` — rebuild one count category.
pub async fn recount(
    state: State<AppState>,
    Query(query): Query<RecountQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    accept_job(&state, JobKind::Recount(query.criteria.into())).await
}
