//! Fix request entity model and DTOs.

use patchdock_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::status::StatusId;

/// A row from the `fix_requests` table: one change request against a
/// project, owned exclusively by the fix pipeline once submitted.
///
/// `staging_branch` and `preview_url` are non-null only while the fix sits
/// in preview_ready/approved/deploying; reject and deploy both clear them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FixRequest {
    pub id: DbId,
    pub project_id: DbId,
    pub user_id: DbId,
    pub description: String,
    pub status_id: StatusId,
    pub complexity_id: Option<StatusId>,
    pub price_cents: Option<i32>,
    pub stripe_payment_intent_id: Option<String>,
    /// Structured triage output (complexity, summary, affected files,
    /// confidence) persisted verbatim so generation can recompute from it.
    pub triage_result: Option<serde_json::Value>,
    /// Structured generation output (file edits + explanation).
    pub generation_result: Option<serde_json::Value>,
    pub staging_branch: Option<String>,
    pub preview_url: Option<String>,
    pub error_log: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for submitting a new fix request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitFix {
    #[validate(length(min = 10, max = 5000))]
    pub description: String,
}

/// Fields written by a successful triage step.
#[derive(Debug, Clone)]
pub struct TriageOutcome {
    pub complexity_id: StatusId,
    pub triage_result: serde_json::Value,
}

/// Fields written when a preview becomes available.
#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    pub generation_result: serde_json::Value,
    pub staging_branch: String,
    pub preview_url: Option<String>,
}
