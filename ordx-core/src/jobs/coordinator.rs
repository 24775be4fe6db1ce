//! Recompute coordinator.
//!
//! Turns admin requests into detached jobs. The caller gets the job id back
//! as soon as the job is registered; success or failure is recorded on the
//! job and logged, never returned to the caller.
//!
//! Duplicate requests are not deduplicated. Every recompute is a full
//! replacement computed from the ledger, so overlapping runs on the same
//! table settle on the same contents.

use crate::jobs::{JobError, JobHandle, JobKind, JobRegistry, JobSnapshot};
use crate::processors::count_aggregator::CountAggregator;
use crate::processors::location_tracker::LocationTracker;
use crate::processors::scanner::{BlockScanner, ScanOutcome};
use kanau::processor::Processor;
use ordx_sdk::objects::admin::JobStatus;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct RecomputeCoordinator {
    registry: Arc<JobRegistry>,
    locations: LocationTracker,
    counts: CountAggregator,
    scanner: Arc<BlockScanner>,
}

impl RecomputeCoordinator {
    pub fn new(
        registry: Arc<JobRegistry>,
        locations: LocationTracker,
        counts: CountAggregator,
        scanner: Arc<BlockScanner>,
    ) -> Self {
        Self {
            registry,
            locations,
            counts,
            scanner,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Register `kind` and run it in the background.
    pub async fn dispatch(&self, kind: JobKind) -> Result<Uuid, JobError> {
        if let JobKind::Scan {
            start_block,
            end_block,
        } = kind
        {
            if start_block > end_block {
                return Err(JobError::InvalidRange {
                    start: start_block,
                    end: end_block,
                });
            }
        }
        let handle = self.registry.register(kind).await;
        let id = handle.id();
        info!(job_id = %id, job = %kind, "Job accepted");

        let span = info_span!("job", job_id = %id, job = %kind);
        tokio::spawn(self.clone().run(handle).instrument(span));
        Ok(id)
    }

    pub async fn cancel(&self, id: Uuid) -> Result<JobSnapshot, JobError> {
        let snapshot = self.registry.cancel(id).await?;
        info!(job_id = %id, "Job cancellation requested");
        Ok(snapshot)
    }

    async fn run(self, handle: JobHandle) {
        if handle.is_cancelled() {
            warn!("Job cancelled before it started");
            handle.finish(JobStatus::Cancelled, None).await;
            return;
        }
        handle.start().await;
        info!("Job started");

        let result: Result<JobStatus, String> = match handle.kind() {
            JobKind::Reposition(table) => self
                .locations
                .process(table)
                .await
                .map(|_| JobStatus::Completed)
                .map_err(|e| e.to_string()),
            JobKind::Recount(category) => self
                .counts
                .process(category)
                .await
                .map(|_| JobStatus::Completed)
                .map_err(|e| e.to_string()),
            JobKind::Scan {
                start_block,
                end_block,
            } => match self.scanner.scan(start_block, end_block, &handle).await {
                Ok(ScanOutcome::Completed { .. }) => Ok(JobStatus::Completed),
                Ok(ScanOutcome::Cancelled { .. }) => Ok(JobStatus::Cancelled),
                Err(e) => Err(e.to_string()),
            },
        };

        match result {
            Ok(JobStatus::Cancelled) => {
                warn!("Job cancelled");
                handle.finish(JobStatus::Cancelled, None).await;
            }
            Ok(status) => {
                info!("Job finished");
                handle.finish(status, None).await;
            }
            Err(error) => {
                error!(%error, "Job failed");
                handle.finish(JobStatus::Failed, Some(error)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, IngestConfig, SyncConfig};
    use crate::entities::{CountCategory, LocationTable};
    use crate::processors::block_sync::MemoryBlockSource;
    use crate::processors::ingestor::ApplyMode;
    use crate::store::MemoryStore;
    use crate::testing::{block, memory_ingestor, reveal, transfer};

    async fn seeded() -> (Arc<MemoryStore>, RecomputeCoordinator) {
        let (store, ingestor) = memory_ingestor(IngestConfig::LEDGER_ONLY);
        let blocks = vec![
            block(
                100,
                vec![
                    reveal(1, 0, "text/plain", 0, Some("h0")),
                    reveal(2, 1, "image/png", 1, Some("h0")),
                ],
            ),
            block(101, vec![transfer(1, 1, 3, 0, Some("h1"))]),
            block(102, vec![transfer(1, 3, 4, 2, Some("h2"))]),
        ];
        for b in &blocks {
            ingestor.apply_block(b, ApplyMode::Forward).await.unwrap();
        }
        let source = Arc::new(MemoryBlockSource::with_blocks(blocks));
        let scanner = BlockScanner::new(ingestor, source, ConfigStore::new(SyncConfig::default()));
        let coordinator = RecomputeCoordinator::new(
            Arc::new(JobRegistry::default()),
            LocationTracker::new(store.clone()),
            CountAggregator::new(store.clone()),
            Arc::new(scanner),
        );
        (store, coordinator)
    }

    async fn run_to_end(coordinator: &RecomputeCoordinator, kind: JobKind) -> JobSnapshot {
        let id = coordinator.dispatch(kind).await.unwrap();
        coordinator.registry().wait_finished(id).await.unwrap()
    }

    #[tokio::test]
    async fn recompute_jobs_complete() {
        let (store, coordinator) = seeded().await;

        let job = run_to_end(&coordinator, JobKind::Reposition(LocationTable::Genesis)).await;
        assert_eq!(job.status, JobStatus::Completed);
        let job = run_to_end(&coordinator, JobKind::Reposition(LocationTable::Current)).await;
        assert_eq!(job.status, JobStatus::Completed);
        let job = run_to_end(&coordinator, JobKind::Recount(CountCategory::Address)).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.started_at.is_some());
        assert!(job.error.is_none());

        assert_eq!(store.count_of(CountCategory::Address, "h2").await, 1);
        assert_eq!(store.count_of(CountCategory::Address, "h0").await, 1);
    }

    #[tokio::test]
    async fn overlapping_jobs_converge_to_a_single_run() {
        let (single_store, single) = seeded().await;
        for kind in [
            JobKind::Reposition(LocationTable::Genesis),
            JobKind::Reposition(LocationTable::Current),
            JobKind::Recount(CountCategory::GenesisAddress),
        ] {
            run_to_end(&single, kind).await;
        }

        let (store, coordinator) = seeded().await;
        for kind in [
            JobKind::Reposition(LocationTable::Genesis),
            JobKind::Reposition(LocationTable::Current),
        ] {
            let a = coordinator.dispatch(kind).await.unwrap();
            let b = coordinator.dispatch(kind).await.unwrap();
            coordinator.registry().wait_finished(a).await.unwrap();
            coordinator.registry().wait_finished(b).await.unwrap();
        }
        let kind = JobKind::Recount(CountCategory::GenesisAddress);
        let a = coordinator.dispatch(kind).await.unwrap();
        let b = coordinator.dispatch(kind).await.unwrap();
        assert_ne!(a, b);
        coordinator.registry().wait_finished(a).await.unwrap();
        coordinator.registry().wait_finished(b).await.unwrap();

        assert_eq!(store.snapshot().await, single_store.snapshot().await);
    }

    #[tokio::test]
    async fn failures_are_recorded_on_the_job() {
        let (store, coordinator) = seeded().await;
        store.set_unavailable(true);
        let job = run_to_end(&coordinator, JobKind::Recount(CountCategory::MimeType)).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("unavailable"));

        store.set_unavailable(false);
        let job = run_to_end(&coordinator, JobKind::Recount(CountCategory::MimeType)).await;
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn scan_job_reports_progress() {
        let (_, coordinator) = seeded().await;
        let job = run_to_end(
            &coordinator,
            JobKind::Scan {
                start_block: 100,
                end_block: 102,
            },
        )
        .await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.blocks_applied, 3);
        assert_eq!(job.last_block, Some(102));

        let job = run_to_end(
            &coordinator,
            JobKind::Scan {
                start_block: 100,
                end_block: 110,
            },
        )
        .await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("103"));
    }

    #[tokio::test]
    async fn invalid_scan_range_is_rejected_up_front() {
        let (_, coordinator) = seeded().await;
        let err = coordinator
            .dispatch(JobKind::Scan {
                start_block: 10,
                end_block: 9,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidRange { start: 10, end: 9 }));
        assert!(coordinator.registry().list().await.is_empty());
    }

    #[tokio::test]
    async fn job_cancelled_before_start_never_runs() {
        let (store, coordinator) = seeded().await;
        let handle = coordinator
            .registry()
            .register(JobKind::Recount(CountCategory::Type))
            .await;
        let id = handle.id();
        coordinator.cancel(id).await.unwrap();

        coordinator.clone().run(handle).await;
        let job = coordinator.registry().get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.started_at.is_none());
        assert_eq!(store.count_of(CountCategory::Type, "blessed").await, 0);
    }
}
