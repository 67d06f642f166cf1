//! Handlers for the `/deployments` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use patchdock_core::error::CoreError;
use patchdock_core::types::DbId;
use patchdock_db::models::deployment::{Deployment, RecordDeployment};
use patchdock_db::models::status::DeploymentStatus;
use patchdock_db::repositories::{DeploymentRepo, ProjectRepo};
use patchdock_pipeline::poller;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Fetch a deployment and verify the caller owns its parent project.
/// Ownership failures surface as NotFound, never as Forbidden, so the
/// endpoint does not leak which deployment ids exist.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    deployment_id: DbId,
    auth: &AuthUser,
) -> AppResult<Deployment> {
    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "Deployment",
            id: deployment_id,
        })
    };

    let deployment = DeploymentRepo::find_by_id(pool, deployment_id)
        .await?
        .ok_or_else(not_found)?;

    ProjectRepo::find_owned(pool, deployment.project_id, auth.user.id)
        .await?
        .ok_or_else(not_found)?;

    Ok(deployment)
}

/// GET /api/v1/deployments/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(deployment_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deployment = find_and_authorize(&state.pool, deployment_id, &auth).await?;
    Ok(Json(DataResponse { data: deployment }))
}

/// POST /api/v1/deployments/{id}/refresh
///
/// Synchronously reconcile this deployment against the deployment host
/// and return the updated row. The background sweep does the same thing
/// on an interval; this is for an impatient dashboard.
pub async fn refresh(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(deployment_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, deployment_id, &auth).await?;

    poller::poll_deployment_status(&state.pipeline, deployment_id).await?;

    let deployment = DeploymentRepo::find_by_id(&state.pool, deployment_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Deployment",
            id: deployment_id,
        }))?;
    Ok(Json(DataResponse { data: deployment }))
}

/// POST /api/v1/deployments/{id}/rollback
///
/// Record a queued rollback build pointing at this deployment's commit.
/// The audit trail always gains a fresh row; the original is untouched.
pub async fn rollback(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(deployment_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deployment = find_and_authorize(&state.pool, deployment_id, &auth).await?;

    let target = deployment
        .commit_hash
        .as_deref()
        .map(|hash| hash.chars().take(7).collect::<String>())
        .unwrap_or_else(|| "previous".to_string());

    let rollback = DeploymentRepo::record(
        &state.pool,
        &RecordDeployment {
            project_id: deployment.project_id,
            vercel_deployment_id: None,
            commit_hash: deployment.commit_hash.clone(),
            commit_message: Some(format!("Rollback to {target}")),
            branch: deployment.branch.clone(),
            status_id: DeploymentStatus::Queued.id(),
            url: None,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: rollback })))
}
