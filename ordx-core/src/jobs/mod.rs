//! Admin-triggered background jobs.
//!
//! Every reposition, recount and scan request becomes a job in the
//! [`JobRegistry`], runs as a detached task and can be inspected or
//! cooperatively cancelled by id while it runs.

pub mod coordinator;
pub mod registry;

pub use coordinator::RecomputeCoordinator;
pub use registry::{JobHandle, JobRegistry};

use crate::entities::{CountCategory, LocationTable};
use ordx_sdk::objects::admin::{JobKind as SdkJobKind, JobResponse, JobStatus};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Replay an inclusive block range through the ingestor.
    Scan { start_block: u64, end_block: u64 },
    Reposition(LocationTable),
    Recount(CountCategory),
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Scan {
                start_block,
                end_block,
            } => write!(f, "scan {start_block}..={end_block}"),
            JobKind::Reposition(table) => write!(f, "reposition {table}"),
            JobKind::Recount(category) => write!(f, "recount {category}"),
        }
    }
}

impl From<JobKind> for SdkJobKind {
    fn from(value: JobKind) -> Self {
        match value {
            JobKind::Scan {
                start_block,
                end_block,
            } => SdkJobKind::Scan {
                start_block,
                end_block,
            },
            JobKind::Reposition(table) => SdkJobKind::Reposition {
                criteria: table.into(),
            },
            JobKind::Recount(category) => SdkJobKind::Recount {
                criteria: category.into(),
            },
        }
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub requested_at: OffsetDateTime,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
    pub error: Option<String>,
    pub blocks_applied: u64,
    pub last_block: Option<u64>,
}

impl From<JobSnapshot> for JobResponse {
    fn from(value: JobSnapshot) -> Self {
        Self {
            id: value.id,
            kind: value.kind.into(),
            status: value.status,
            requested_at: value.requested_at.unix_timestamp(),
            started_at: value.started_at.map(OffsetDateTime::unix_timestamp),
            finished_at: value.finished_at.map(OffsetDateTime::unix_timestamp),
            error: value.error,
            blocks_applied: value.blocks_applied,
            last_block: value.last_block,
        }
    }
}

/// Shared cancellation request, polled by the job at safe points.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {id} already finished as {status:?}")]
    AlreadyFinished { id: Uuid, status: JobStatus },

    #[error("invalid block range {start}..={end}")]
    InvalidRange { start: u64, end: u64 },
}
