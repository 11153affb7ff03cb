//! Worker-pool dispatcher for batch jobs.

use babel_abstraction::ErrorKind;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::batch::error::BatchError;
use crate::batch::types::{BatchJob, BatchReport, ErrorRecord, VariantOutcome};
use crate::orchestrator::CacheOrchestrator;

/// Resolves every variant of a batch job through the orchestrator.
///
/// A job runs `min(concurrency_limit, variants)` workers that pull from one
/// shared queue. Each worker finishes a variant before taking the next, so the
/// number of in-flight provider calls never exceeds the limit.
///
/// Dropping the future returned by [`ConcurrencyDispatcher::run`] abandons the
/// batch: variants already in flight run to completion and still populate the
/// caches, queued variants are never started.
#[derive(Clone)]
pub struct ConcurrencyDispatcher {
    orchestrator: Arc<CacheOrchestrator>,
}

struct Shared {
    input: String,
    source_variant: Option<String>,
    queue: Mutex<VecDeque<String>>,
    outcomes: Mutex<BTreeMap<String, VariantOutcome>>,
}

impl ConcurrencyDispatcher {
    /// Create a new dispatcher over `orchestrator`.
    pub const fn new(orchestrator: Arc<CacheOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Runs `job` to completion and reports one outcome per distinct variant.
    ///
    /// # Errors
    /// Returns `BatchError::InvalidConfig` if the concurrency limit is zero.
    pub async fn run(&self, job: BatchJob) -> Result<BatchReport, BatchError> {
        if job.concurrency_limit == 0 {
            return Err(BatchError::InvalidConfig(
                "concurrency_limit must be greater than 0".to_string(),
            ));
        }

        let start_time = Instant::now();
        let total = job.target_variants.len();
        if total == 0 {
            return Ok(BatchReport::new(BTreeMap::new(), start_time.elapsed()));
        }

        let workers = job.concurrency_limit.min(total);
        info!(
            total_variants = total,
            workers,
            provider = self.orchestrator.provider_id(),
            "Starting batch"
        );

        let variants: Vec<String> = job.target_variants.into_iter().collect();
        let shared = Arc::new(Shared {
            input: job.input,
            source_variant: job.source_variant,
            queue: Mutex::new(variants.iter().cloned().collect()),
            outcomes: Mutex::new(BTreeMap::new()),
        });

        // Cancelled when this future completes or is dropped.
        let cancel = CancellationToken::new();
        let _abandon_guard = cancel.clone().drop_guard();

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                tokio::spawn(work(
                    worker,
                    Arc::clone(&self.orchestrator),
                    Arc::clone(&shared),
                    cancel.clone(),
                ))
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Batch worker terminated abnormally");
            }
        }

        let mut outcomes =
            std::mem::take(&mut *shared.outcomes.lock().unwrap_or_else(PoisonError::into_inner));
        for variant in variants {
            outcomes.entry(variant).or_insert_with(|| {
                VariantOutcome::Failed(ErrorRecord {
                    kind: ErrorKind::Unknown,
                    message: "worker terminated before resolving variant".to_string(),
                    attempts: 0,
                })
            });
        }

        let report = BatchReport::new(outcomes, start_time.elapsed());
        info!(
            total_variants = report.total_variants(),
            successful = report.successful,
            failed = report.failed,
            duration_ms = report.total_duration.as_millis() as u64,
            "Batch completed"
        );
        Ok(report)
    }
}

async fn work(
    worker: usize,
    orchestrator: Arc<CacheOrchestrator>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            debug!(worker, "Batch abandoned, worker stopping");
            return;
        }

        let next = shared.queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        let Some(variant) = next else {
            return;
        };

        debug!(worker, variant = %variant, "Resolving variant");
        let outcome = match orchestrator
            .resolve(&shared.input, shared.source_variant.as_deref(), &variant)
            .await
        {
            Ok(resolution) => VariantOutcome::Translated(resolution.into_translation(&shared.input)),
            Err(e) => {
                debug!(worker, variant = %variant, error = %e, "Variant failed");
                VariantOutcome::Failed(ErrorRecord::from(&e))
            }
        };

        shared.outcomes.lock().unwrap_or_else(PoisonError::into_inner).insert(variant, outcome);
    }
}
