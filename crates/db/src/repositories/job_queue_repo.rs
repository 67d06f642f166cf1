//! Repository for the `pipeline_jobs` table -- the durable work queue.
//!
//! Uses `FOR UPDATE SKIP LOCKED` on claim so multiple runner instances
//! never dispatch the same job twice, and a pending job enqueued before a
//! crash is picked up after restart.

use patchdock_core::types::DbId;
use sqlx::PgPool;

use crate::models::pipeline_job::PipelineJob;
use crate::models::status::JobStatus;

/// Column list for `pipeline_jobs` queries.
const COLUMNS: &str = "\
    id, job_type, entity_id, status_id, error_message, \
    enqueued_at, started_at, completed_at";

/// Provides queue operations for pipeline jobs.
pub struct JobQueueRepo;

impl JobQueueRepo {
    /// Enqueue a new pending job.
    pub async fn enqueue(
        pool: &PgPool,
        job_type: &str,
        entity_id: DbId,
    ) -> Result<PipelineJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO pipeline_jobs (job_type, entity_id, status_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PipelineJob>(&query)
            .bind(job_type)
            .bind(entity_id)
            .bind(JobStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest pending job.
    ///
    /// `FOR UPDATE SKIP LOCKED` prevents double-dispatch when multiple
    /// runner instances poll concurrently.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<PipelineJob>, sqlx::Error> {
        let query = format!(
            "UPDATE pipeline_jobs \
             SET status_id = $1, started_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM pipeline_jobs \
                 WHERE status_id = $2 \
                 ORDER BY enqueued_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PipelineJob>(&query)
            .bind(JobStatus::Running.id())
            .bind(JobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a job completed.
    pub async fn complete(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE pipeline_jobs SET status_id = $2, completed_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job failed with the triggering error. The error is persisted
    /// here as well as on the entity so the queue itself is auditable.
    pub async fn fail(pool: &PgPool, job_id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE pipeline_jobs \
             SET status_id = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Count jobs currently pending (used by tests and health reporting).
    pub async fn pending_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_jobs WHERE status_id = $1")
            .bind(JobStatus::Pending.id())
            .fetch_one(pool)
            .await
    }
}
