use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use ordx_core::jobs::JobError;
use ordx_sdk::objects::admin::JobResponse;
use uuid::Uuid;

use crate::state::AppState;

use super::AdminApiError;

/// `GET /jobs` — every retained job, newest first.
pub async fn list_jobs(state: State<AppState>) -> impl IntoResponse {
    let jobs: Vec<JobResponse> = state
        .coordinator
        .registry()
        .list()
        .await
        .into_iter()
        .map(Into::into)
        .collect();
    Json(jobs)
}

/// `GET /jobs/{job_id}`
pub async fn get_job(
    state: State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let job = state
        .coordinator
        .registry()
        .get(job_id)
        .await
        .ok_or(JobError::NotFound(job_id))?;
    Ok(Json(JobResponse::from(job)))
}

/// `POST /jobs/{job_id}/cancel` — cooperative; the job stops at its next
/// safe point.
pub async fn cancel_job(
    state: State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let job = state.coordinator.cancel(job_id).await?;
    Ok(Json(JobResponse::from(job)))
}
