//! Durable pipeline job model.
//!
//! A `pipeline_jobs` row is the unit of background work: which orchestrator
//! step to run and which entity to run it against. HTTP handlers enqueue;
//! the runner claims with `FOR UPDATE SKIP LOCKED` so a step survives a
//! process restart and never runs twice concurrently.

use patchdock_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::status::StatusId;

/// Known job types. Stored as text so the queue stays inspectable with
/// plain SQL; the runner rejects anything outside this set.
pub const JOB_MIGRATE_PROJECT: &str = "migrate_project";
pub const JOB_TRIAGE_FIX: &str = "triage_fix";
pub const JOB_GENERATE_FIX: &str = "generate_fix";
pub const JOB_DEPLOY_FIX: &str = "deploy_fix";

/// A row from the `pipeline_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PipelineJob {
    pub id: DbId,
    pub job_type: String,
    /// The fix request or project the step targets. Steps recompute
    /// everything else from the entity's persisted row.
    pub entity_id: DbId,
    pub status_id: StatusId,
    pub error_message: Option<String>,
    pub enqueued_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}
