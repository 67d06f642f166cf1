//! Handlers for the `/fixes` resource.
//!
//! Ownership checks live here; state-precondition checks live in the
//! pipeline layer, which every caller goes through. Background steps are
//! enqueued on the durable job queue and acknowledged immediately.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use patchdock_core::error::CoreError;
use patchdock_core::types::DbId;
use patchdock_db::models::fix_request::FixRequest;
use patchdock_db::models::pipeline_job::{JOB_GENERATE_FIX, JOB_TRIAGE_FIX};
use patchdock_db::repositories::{FixRequestRepo, JobQueueRepo};
use patchdock_pipeline::fix as fix_pipeline;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Fetch a fix by ID and verify the caller owns it.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    fix_id: DbId,
    auth: &AuthUser,
) -> AppResult<FixRequest> {
    FixRequestRepo::find_owned(pool, fix_id, auth.user.id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "FixRequest",
            id: fix_id,
        }))
}

/// GET /api/v1/fixes/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fix_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let fix = find_and_authorize(&state.pool, fix_id, &auth).await?;
    Ok(Json(DataResponse { data: fix }))
}

/// POST /api/v1/fixes/{id}/triage
///
/// Re-enqueue triage (it also runs automatically on submission). Safe
/// against a `failed` fix; the pipeline claim rejects anything else.
pub async fn triage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fix_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, fix_id, &auth).await?;
    let job = JobQueueRepo::enqueue(&state.pool, JOB_TRIAGE_FIX, fix_id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job })))
}

/// Confirm response: the updated fix plus the secret the dashboard needs
/// to collect payment.
#[derive(Serialize)]
pub struct ConfirmResponse {
    #[serde(flatten)]
    pub fix: FixRequest,
    pub client_secret: Option<String>,
}

/// POST /api/v1/fixes/{id}/confirm
///
/// Synchronous: creates the charge intent and moves the fix to
/// `awaiting_payment`. 409 when the fix is not confirmable.
pub async fn confirm(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fix_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, fix_id, &auth).await?;

    let (fix, client_secret) =
        fix_pipeline::confirm_fix(&state.pipeline, fix_id, &auth.user).await?;

    Ok(Json(DataResponse {
        data: ConfirmResponse { fix, client_secret },
    }))
}

/// POST /api/v1/fixes/{id}/start
///
/// Manually enqueue generation (normally driven by the payment webhook).
pub async fn start(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fix_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, fix_id, &auth).await?;
    let job = JobQueueRepo::enqueue(&state.pool, JOB_GENERATE_FIX, fix_id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job })))
}

/// POST /api/v1/fixes/{id}/approve
///
/// Synchronous approve; the production deploy runs in the background.
/// 409 unless the fix is `preview_ready`.
pub async fn approve(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fix_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, fix_id, &auth).await?;
    let fix = fix_pipeline::approve_fix(&state.pipeline, fix_id).await?;
    Ok(Json(DataResponse { data: fix }))
}

/// POST /api/v1/fixes/{id}/reject
///
/// Synchronous reject: discards the staging branch and preview. 409
/// unless the fix is `preview_ready`.
pub async fn reject(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fix_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, fix_id, &auth).await?;
    fix_pipeline::reject_fix(&state.pipeline, fix_id).await?;

    let fix = find_and_authorize(&state.pool, fix_id, &auth).await?;
    Ok(Json(DataResponse { data: fix }))
}
