use crate::jobs::{CancelFlag, JobError, JobKind, JobSnapshot};
use ordx_sdk::objects::admin::JobStatus;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

/// Finished jobs kept for inspection before the oldest are evicted.
pub const DEFAULT_JOB_HISTORY: usize = 256;

struct JobEntry {
    snapshot: JobSnapshot,
    cancel: CancelFlag,
}

#[derive(Default)]
struct Jobs {
    entries: HashMap<Uuid, JobEntry>,
    /// Ids in registration order.
    order: VecDeque<Uuid>,
}

impl Jobs {
    /// Drop the oldest finished jobs beyond `history`. Unfinished jobs are
    /// never evicted.
    fn evict(&mut self, history: usize) {
        while self.entries.len() > history {
            let Some(position) = self.order.iter().position(|id| {
                self.entries
                    .get(id)
                    .is_some_and(|e| e.snapshot.status.is_finished())
            }) else {
                break;
            };
            if let Some(id) = self.order.remove(position) {
                self.entries.remove(&id);
            }
        }
    }
}

/// Maps job ids to their lifecycle state.
pub struct JobRegistry {
    jobs: RwLock<Jobs>,
    history: usize,
    revision: watch::Sender<u64>,
}

impl JobRegistry {
    pub fn new(history: usize) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            jobs: RwLock::new(Jobs::default()),
            history,
            revision,
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Register a new job in the `Requested` state.
    pub async fn register(self: &Arc<Self>, kind: JobKind) -> JobHandle {
        let id = Uuid::now_v7();
        let cancel = CancelFlag::default();
        {
            let mut jobs = self.jobs.write().await;
            jobs.entries.insert(
                id,
                JobEntry {
                    snapshot: JobSnapshot {
                        id,
                        kind,
                        status: JobStatus::Requested,
                        requested_at: OffsetDateTime::now_utc(),
                        started_at: None,
                        finished_at: None,
                        error: None,
                        blocks_applied: 0,
                        last_block: None,
                    },
                    cancel: cancel.clone(),
                },
            );
            jobs.order.push_back(id);
            jobs.evict(self.history);
        }
        self.bump();
        JobHandle {
            id,
            kind,
            cancel,
            registry: Arc::clone(self),
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<JobSnapshot> {
        self.jobs
            .read()
            .await
            .entries
            .get(&id)
            .map(|e| e.snapshot.clone())
    }

    /// All retained jobs, newest first.
    pub async fn list(&self) -> Vec<JobSnapshot> {
        let jobs = self.jobs.read().await;
        jobs.order
            .iter()
            .rev()
            .filter_map(|id| jobs.entries.get(id))
            .map(|e| e.snapshot.clone())
            .collect()
    }

    /// Ask a job to stop. It finishes as `Cancelled` at its next safe point.
    pub async fn cancel(&self, id: Uuid) -> Result<JobSnapshot, JobError> {
        let jobs = self.jobs.read().await;
        let entry = jobs.entries.get(&id).ok_or(JobError::NotFound(id))?;
        if entry.snapshot.status.is_finished() {
            return Err(JobError::AlreadyFinished {
                id,
                status: entry.snapshot.status,
            });
        }
        entry.cancel.cancel();
        Ok(entry.snapshot.clone())
    }

    /// Wait until the job finishes. `None` if it is unknown or was evicted.
    pub async fn wait_finished(&self, id: Uuid) -> Option<JobSnapshot> {
        let mut revision = self.revision.subscribe();
        loop {
            match self.get(id).await {
                Some(snapshot) if snapshot.status.is_finished() => return Some(snapshot),
                Some(_) => {}
                None => return None,
            }
            if revision.changed().await.is_err() {
                return self.get(id).await;
            }
        }
    }

    async fn update(&self, id: Uuid, apply: impl FnOnce(&mut JobSnapshot)) {
        {
            let mut jobs = self.jobs.write().await;
            if let Some(entry) = jobs.entries.get_mut(&id) {
                apply(&mut entry.snapshot);
            }
            jobs.evict(self.history);
        }
        self.bump();
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_HISTORY)
    }
}

/// The running side of a registered job.
pub struct JobHandle {
    id: Uuid,
    kind: JobKind,
    cancel: CancelFlag,
    registry: Arc<JobRegistry>,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn start(&self) {
        self.registry
            .update(self.id, |job| {
                job.status = JobStatus::Running;
                job.started_at = Some(OffsetDateTime::now_utc());
            })
            .await;
    }

    pub async fn record_progress(&self, last_block: u64, blocks_applied: u64) {
        self.registry
            .update(self.id, |job| {
                job.last_block = Some(last_block);
                job.blocks_applied = blocks_applied;
            })
            .await;
    }

    /// Move the job to a final state.
    pub async fn finish(self, status: JobStatus, error: Option<String>) {
        self.registry
            .update(self.id, |job| {
                job.status = status;
                job.error = error;
                job.finished_at = Some(OffsetDateTime::now_utc());
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CountCategory;

    #[tokio::test]
    async fn lifecycle_is_recorded() {
        let registry = Arc::new(JobRegistry::default());
        let handle = registry.register(JobKind::Recount(CountCategory::Type)).await;
        let id = handle.id();
        assert_eq!(registry.get(id).await.unwrap().status, JobStatus::Requested);

        handle.start().await;
        let running = registry.get(id).await.unwrap();
        assert_eq!(running.status, JobStatus::Running);
        assert!(running.started_at.is_some());

        handle.finish(JobStatus::Completed, None).await;
        let done = registry.wait_finished(id).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.finished_at.is_some());
    }

    #[tokio::test]
    async fn cancel_sets_the_flag_until_finished() {
        let registry = Arc::new(JobRegistry::default());
        let handle = registry
            .register(JobKind::Scan {
                start_block: 1,
                end_block: 9,
            })
            .await;
        let id = handle.id();

        registry.cancel(id).await.unwrap();
        assert!(handle.is_cancelled());

        handle.finish(JobStatus::Cancelled, None).await;
        assert!(matches!(
            registry.cancel(id).await,
            Err(JobError::AlreadyFinished {
                status: JobStatus::Cancelled,
                ..
            })
        ));
        assert!(matches!(
            registry.cancel(Uuid::now_v7()).await,
            Err(JobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn history_evicts_only_finished_jobs() {
        let registry = Arc::new(JobRegistry::new(2));
        let first = registry.register(JobKind::Recount(CountCategory::Type)).await;
        let first_id = first.id();
        first.finish(JobStatus::Completed, None).await;

        let running = registry.register(JobKind::Recount(CountCategory::Address)).await;
        let third = registry.register(JobKind::Recount(CountCategory::MimeType)).await;

        assert!(registry.get(first_id).await.is_none());
        assert!(registry.get(running.id()).await.is_some());

        // Nothing finished to evict: the registry grows past its history.
        let fourth = registry.register(JobKind::Recount(CountCategory::SatRarity)).await;
        let listed: Vec<Uuid> = registry.list().await.iter().map(|j| j.id).collect();
        assert_eq!(listed, [fourth.id(), third.id(), running.id()]);
    }
}
