//! Durable job queue runner.
//!
//! Polls `pipeline_jobs` and dispatches claimed jobs to the matching
//! orchestrator step. The claim (`FOR UPDATE SKIP LOCKED`) is what makes
//! background steps survive restarts and never run twice concurrently,
//! replacing bare fire-and-forget dispatch.

use std::time::Duration;

use patchdock_db::models::pipeline_job::{
    PipelineJob, JOB_DEPLOY_FIX, JOB_GENERATE_FIX, JOB_MIGRATE_PROJECT, JOB_TRIAGE_FIX,
};
use patchdock_db::repositories::JobQueueRepo;
use tokio_util::sync::CancellationToken;

use crate::{fix, migration, PipelineContext};

/// Default polling interval for the runner loop.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Background pipeline runner.
///
/// A single long-lived Tokio task that drains pending jobs. Multiple
/// instances may run; the claim keeps them from colliding.
pub struct PipelineRunner {
    ctx: PipelineContext,
    poll_interval: Duration,
}

impl PipelineRunner {
    /// Create a runner with the default 1-second poll interval.
    pub fn new(ctx: PipelineContext) -> Self {
        Self {
            ctx,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Run the dispatch loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Pipeline runner started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Pipeline runner shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.drain().await;
                }
            }
        }
    }

    /// Claim and execute jobs until the queue is empty.
    async fn drain(&self) {
        loop {
            let job = match JobQueueRepo::claim_next(&self.ctx.pool).await {
                Ok(Some(job)) => job,
                Ok(None) => return,
                Err(e) => {
                    tracing::error!(error = %e, "Job claim failed");
                    return;
                }
            };

            tracing::info!(
                job_id = job.id,
                job_type = %job.job_type,
                entity_id = job.entity_id,
                "Job claimed",
            );
            self.execute(&job).await;
        }
    }

    /// Execute one claimed job and record its outcome on the queue row.
    /// Step errors have already been persisted on the entity; here they
    /// are logged and the job is marked failed so the queue stays honest.
    async fn execute(&self, job: &PipelineJob) {
        let result: Result<(), String> = match job.job_type.as_str() {
            JOB_MIGRATE_PROJECT => {
                let outcome = migration::run_migration(&self.ctx, job.entity_id).await;
                if outcome.success {
                    Ok(())
                } else {
                    Err(outcome.error.unwrap_or_else(|| "migration failed".to_string()))
                }
            }
            JOB_TRIAGE_FIX => fix::triage_fix(&self.ctx, job.entity_id)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            JOB_GENERATE_FIX => fix::generate_and_preview(&self.ctx, job.entity_id)
                .await
                .map_err(|e| e.to_string()),
            JOB_DEPLOY_FIX => fix::deploy_fix(&self.ctx, job.entity_id)
                .await
                .map_err(|e| e.to_string()),
            other => Err(format!("unknown job type: {other}")),
        };

        let persisted = match result {
            Ok(()) => JobQueueRepo::complete(&self.ctx.pool, job.id).await,
            Err(error) => {
                tracing::error!(
                    job_id = job.id,
                    job_type = %job.job_type,
                    entity_id = job.entity_id,
                    error = %error,
                    "Job failed",
                );
                JobQueueRepo::fail(&self.ctx.pool, job.id, &error).await
            }
        };

        if let Err(e) = persisted {
            tracing::error!(job_id = job.id, error = %e, "Failed to record job outcome");
        }
    }
}
