//! Admin RPC handlers.
//!
//! Served on the admin listener under `/ordinals/admin`. Trigger endpoints
//! take their arguments from the query string, return `200` with an empty
//! body as soon as the job is registered, and name the job in a `Location`
//! header.
//!
//! # Endpoints
//!
//! - `POST /brc-20/scan?start_block=&end_block=`   – replay a block range
//! - `POST /inscriptions/reposition?criteria=`     – rebuild a location table
//! - `POST /inscriptions/recount?criteria=`        – rebuild a count category
//! - `GET  /jobs`                                  – list jobs, newest first
//! - `GET  /jobs/{job_id}`                         – show one job
//! - `POST /jobs/{job_id}/cancel`                  – request cancellation
//! - `POST /blocks`                                – push-ingest one block

use axum::{
    Json, Router,
    http::{HeaderName, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use ordx_core::jobs::{JobError, JobKind};
use ordx_core::processors::ingestor::IngestError;
use ordx_sdk::objects::admin::IngestErrorResponse;
use uuid::Uuid;

use crate::state::AppState;

mod blocks;
mod jobs;
mod recount;
mod reposition;
mod scan;

/// Build the Admin RPC router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/brc-20/scan", post(scan::scan_blocks))
        .route(
            "/inscriptions/reposition",
            post(reposition::reposition),
        )
        .route("/inscriptions/recount", post(recount::recount))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{job_id}", get(jobs::get_job))
        .route("/jobs/{job_id}/cancel", post(jobs::cancel_job))
        .route("/blocks", post(blocks::push_block))
}

/// Empty `200` naming the accepted job.
type Accepted = (StatusCode, [(HeaderName, String); 1]);

/// Dispatch `kind` and answer with the job's location.
async fn accept_job(state: &AppState, kind: JobKind) -> Result<Accepted, AdminApiError> {
    let job_id = state.coordinator.dispatch(kind).await?;
    Ok((
        StatusCode::OK,
        [(header::LOCATION, job_location(job_id))],
    ))
}

pub(crate) fn job_location(job_id: Uuid) -> String {
    format!("/ordinals/admin/jobs/{job_id}")
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Job(JobError),
    Ingest { height: u64, error: IngestError },
}

impl From<JobError> for AdminApiError {
    fn from(value: JobError) -> Self {
        AdminApiError::Job(value)
    }
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::Job(e @ JobError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, e.to_string()).into_response()
            }
            AdminApiError::Job(e @ JobError::AlreadyFinished { .. }) => {
                (StatusCode::CONFLICT, e.to_string()).into_response()
            }
            AdminApiError::Job(e @ JobError::InvalidRange { .. }) => {
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            AdminApiError::Ingest { height, error } if error.is_malformed() => {
                tracing::warn!(height, code = error.code(), error = %error, "Rejected malformed block");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(IngestErrorResponse {
                        height,
                        code: error.code().to_string(),
                        message: error.to_string(),
                    }),
                )
                    .into_response()
            }
            AdminApiError::Ingest { height, error } => {
                tracing::error!(height, error = %error, "Admin API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
