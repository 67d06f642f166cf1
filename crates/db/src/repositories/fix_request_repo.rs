//! Repository for the `fix_requests` table.
//!
//! Every pipeline step owns exactly one transition here. Steps that can be
//! invoked concurrently go through [`FixRequestRepo::claim_status`], a
//! conditional single-row update only one caller can win.

use patchdock_core::types::DbId;
use sqlx::PgPool;

use crate::models::fix_request::{FixRequest, PreviewOutcome, TriageOutcome};
use crate::models::status::{FixStatus, StatusId};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, project_id, user_id, description, status_id, complexity_id, \
    price_cents, stripe_payment_intent_id, triage_result, generation_result, \
    staging_branch, preview_url, error_log, created_at, updated_at";

/// Provides CRUD operations for fix requests.
pub struct FixRequestRepo;

impl FixRequestRepo {
    /// Insert a new fix request in `submitted` status with its quoted price.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
        description: &str,
        price_cents: i32,
    ) -> Result<FixRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO fix_requests (project_id, user_id, description, status_id, price_cents) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FixRequest>(&query)
            .bind(project_id)
            .bind(user_id)
            .bind(description)
            .bind(FixStatus::Submitted.id())
            .bind(price_cents)
            .fetch_one(pool)
            .await
    }

    /// Find a fix request by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<FixRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM fix_requests WHERE id = $1");
        sqlx::query_as::<_, FixRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a fix request by ID, scoped to its owner.
    pub async fn find_owned(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<FixRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM fix_requests WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, FixRequest>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's fix requests, newest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<FixRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM fix_requests WHERE project_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, FixRequest>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Conditionally transition status: applies only while the row is still
    /// in one of the expected states. Returns `true` when this caller won
    /// the transition; a `false` means someone else got there first (or the
    /// fix is in the wrong state entirely).
    pub async fn claim_status(
        pool: &PgPool,
        id: DbId,
        expected: &[FixStatus],
        next: FixStatus,
    ) -> Result<bool, sqlx::Error> {
        let expected_ids: Vec<StatusId> = expected.iter().map(|s| s.id()).collect();
        let result = sqlx::query(
            "UPDATE fix_requests SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = ANY($3)",
        )
        .bind(id)
        .bind(next.id())
        .bind(&expected_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist a successful triage: complexity + structured result, status
    /// `quoted`.
    pub async fn record_triage(
        pool: &PgPool,
        id: DbId,
        outcome: &TriageOutcome,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE fix_requests SET \
                status_id = $2, \
                complexity_id = $3, \
                triage_result = $4, \
                error_log = NULL, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(FixStatus::Quoted.id())
        .bind(outcome.complexity_id)
        .bind(&outcome.triage_result)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Refresh the quoted price (recomputed from the user's completed-fix
    /// counter on every quote).
    pub async fn set_price(pool: &PgPool, id: DbId, price_cents: i32) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE fix_requests SET price_cents = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(price_cents)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Conditionally move a confirmable fix to `awaiting_payment`, recording
    /// the payment intent in the same write. Returns the updated row, or
    /// `None` when the fix was not in a confirmable state.
    pub async fn record_payment_intent(
        pool: &PgPool,
        id: DbId,
        payment_intent_id: &str,
    ) -> Result<Option<FixRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE fix_requests SET \
                status_id = $2, \
                stripe_payment_intent_id = $3, \
                updated_at = NOW() \
             WHERE id = $1 AND status_id = ANY($4) \
             RETURNING {COLUMNS}"
        );
        let confirmable = [FixStatus::Submitted.id(), FixStatus::Quoted.id()];
        sqlx::query_as::<_, FixRequest>(&query)
            .bind(id)
            .bind(FixStatus::AwaitingPayment.id())
            .bind(payment_intent_id)
            .bind(&confirmable[..])
            .fetch_optional(pool)
            .await
    }

    /// Mark payment received: status `in_progress`. Driven by the payment
    /// webhook, out-of-band from the synchronous confirm path. Conditional
    /// on the fix not having advanced already, so a duplicate webhook
    /// delivery is a no-op -- returns `true` only for the first delivery.
    pub async fn mark_paid(
        pool: &PgPool,
        id: DbId,
        payment_intent_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let payable = [
            FixStatus::Submitted.id(),
            FixStatus::Quoted.id(),
            FixStatus::AwaitingPayment.id(),
        ];
        let result = sqlx::query(
            "UPDATE fix_requests SET \
                status_id = $2, \
                stripe_payment_intent_id = $3, \
                updated_at = NOW() \
             WHERE id = $1 AND status_id = ANY($4)",
        )
        .bind(id)
        .bind(FixStatus::InProgress.id())
        .bind(payment_intent_id)
        .bind(&payable[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist a ready preview: generation result, staging branch, preview
    /// URL (nullable when the project has no hosting registration), status
    /// `preview_ready`.
    pub async fn record_preview(
        pool: &PgPool,
        id: DbId,
        outcome: &PreviewOutcome,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE fix_requests SET \
                status_id = $2, \
                generation_result = $3, \
                staging_branch = $4, \
                preview_url = $5, \
                error_log = NULL, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(FixStatus::PreviewReady.id())
        .bind(&outcome.generation_result)
        .bind(&outcome.staging_branch)
        .bind(&outcome.preview_url)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Persist a failed generation attempt together with the structured
    /// failure payload the model returned.
    pub async fn record_generation_failure(
        pool: &PgPool,
        id: DbId,
        generation_result: &serde_json::Value,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE fix_requests SET \
                status_id = $2, \
                generation_result = $3, \
                error_log = $4, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(FixStatus::Failed.id())
        .bind(generation_result)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a fix `deployed`, clearing the staging branch and preview URL.
    pub async fn mark_deployed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE fix_requests SET \
                status_id = $2, \
                staging_branch = NULL, \
                preview_url = NULL, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(FixStatus::Deployed.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Conditionally reject a previewable fix, clearing the staging fields
    /// in the same write. Returns `true` when this caller won the claim.
    pub async fn claim_rejected(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE fix_requests SET \
                status_id = $2, \
                staging_branch = NULL, \
                preview_url = NULL, \
                updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(FixStatus::Rejected.id())
        .bind(FixStatus::PreviewReady.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist a step failure: status `failed` plus a human-readable error.
    /// The staging branch and preview URL are left intact so a failed deploy
    /// can be retried or rejected.
    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE fix_requests SET \
                status_id = $2, \
                error_log = $3, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(FixStatus::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Count a project's fixes, optionally filtered by status.
    pub async fn count_by_project(
        pool: &PgPool,
        project_id: DbId,
        status: Option<FixStatus>,
    ) -> Result<i64, sqlx::Error> {
        match status {
            Some(status) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM fix_requests WHERE project_id = $1 AND status_id = $2",
                )
                .bind(project_id)
                .bind(status.id())
                .fetch_one(pool)
                .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM fix_requests WHERE project_id = $1")
                    .bind(project_id)
                    .fetch_one(pool)
                    .await
            }
        }
    }
}
