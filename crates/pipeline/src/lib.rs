//! The orchestration kernel: the fix pipeline, the migration pipeline,
//! the deployment status poller, and the durable job queue runner.
//!
//! Every step reads the latest entity row, performs a strictly ordered
//! sequence of capability calls, and persists a status checkpoint after
//! each transition. Steps never cache entity state across calls and are
//! safe to re-invoke against a `failed` record.

pub mod fix;
pub mod migration;
pub mod poller;
pub mod runner;

use std::sync::Arc;

use patchdock_ai::AiClient;
use patchdock_core::error::CoreError;
use patchdock_db::DbPool;
use patchdock_github::GitHubClient;
use patchdock_stripe::StripeClient;
use patchdock_vercel::VercelClient;

/// Everything a pipeline step needs: the record store plus the four
/// capability clients. Cheap to clone; clients are shared behind `Arc`.
#[derive(Clone)]
pub struct PipelineContext {
    pub pool: DbPool,
    pub github: Arc<GitHubClient>,
    pub vercel: Arc<VercelClient>,
    pub stripe: Arc<StripeClient>,
    pub ai: Arc<AiClient>,
}

/// Errors surfaced by pipeline steps.
///
/// Capability failures inside a background step are persisted onto the
/// entity (`status = failed` + error log) before this error reaches the
/// runner, which logs it and marks the job failed -- nothing is silently
/// dropped, nothing is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Source control error: {0}")]
    GitHub(#[from] patchdock_github::GitHubError),

    #[error("Deployment host error: {0}")]
    Vercel(#[from] patchdock_vercel::VercelError),

    #[error("Payment host error: {0}")]
    Stripe(#[from] patchdock_stripe::StripeError),

    #[error("AI capability error: {0}")]
    Ai(#[from] patchdock_ai::AiError),
}

impl PipelineError {
    /// Whether this error is a wrong-entity-state rejection (the caller's
    /// request was invalid, not a capability failure).
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, PipelineError::Core(CoreError::InvalidState(_)))
    }
}
