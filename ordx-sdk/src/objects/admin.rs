//! Admin RPC request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CountCriteria, RepositionCriteria};

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Query parameters for `POST /brc-20/scan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanBlocksQuery {
    pub start_block: u64,
    pub end_block: u64,
}

/// Query parameters for `POST /inscriptions/reposition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositionQuery {
    pub criteria: RepositionCriteria,
}

/// Query parameters for `POST /inscriptions/recount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecountQuery {
    pub criteria: CountCriteria,
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Requested,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// What a job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    Scan { start_block: u64, end_block: u64 },
    Reposition { criteria: RepositionCriteria },
    Recount { criteria: CountCriteria },
}

/// Snapshot of a job as held by the server's job registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: JobKind,
    pub status: JobStatus,
    pub requested_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub error: Option<String>,
    /// Blocks applied so far (scan jobs only).
    #[serde(default)]
    pub blocks_applied: u64,
    /// Last block height applied (scan jobs only).
    pub last_block: Option<u64>,
}

// ---------------------------------------------------------------------------
// Push ingestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    Applied,
    Skipped,
}

/// Result of pushing one block to `POST /blocks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestBlockResponse {
    pub height: u64,
    pub outcome: IngestOutcome,
    pub inscriptions_revealed: u64,
    pub transfers_recorded: u64,
}

/// Structured rejection of a malformed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestErrorResponse {
    pub height: u64,
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_is_flattened() {
        let job = JobResponse {
            id: Uuid::nil(),
            kind: JobKind::Recount {
                criteria: CountCriteria::SatRarity,
            },
            status: JobStatus::Completed,
            requested_at: 1,
            started_at: Some(2),
            finished_at: Some(3),
            error: None,
            blocks_applied: 0,
            last_block: None,
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["kind"], "recount");
        assert_eq!(value["criteria"], "sat_rarity");
        assert_eq!(value["status"], "completed");

        let back: JobResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn finished_statuses() {
        assert!(!JobStatus::Requested.is_finished());
        assert!(!JobStatus::Running.is_finished());
        assert!(JobStatus::Completed.is_finished());
        assert!(JobStatus::Failed.is_finished());
        assert!(JobStatus::Cancelled.is_finished());
    }
}
