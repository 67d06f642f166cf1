//! Handlers for the `/projects` resource.
//!
//! All endpoints require authentication via [`AuthUser`]; every lookup is
//! scoped to the caller's own projects. Creation performs bounded
//! validation plus one row write, then enqueues the migration pipeline and
//! returns immediately -- the pipeline itself runs in the background.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use patchdock_core::error::CoreError;
use patchdock_core::pricing::fix_price_cents;
use patchdock_core::types::DbId;
use patchdock_db::models::deployment::RecordDeployment;
use patchdock_db::models::fix_request::SubmitFix;
use patchdock_db::models::pipeline_job::{JOB_MIGRATE_PROJECT, JOB_TRIAGE_FIX};
use patchdock_db::models::project::{CreateProject, Project, UpdateProject};
use patchdock_db::models::status::{DeploymentStatus, FixStatus};
use patchdock_db::repositories::{
    DeploymentRepo, FixRequestRepo, JobQueueRepo, ProjectRepo, UserRepo,
};
use serde::Serialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a project by ID and verify the caller owns it.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    project_id: DbId,
    auth: &AuthUser,
) -> AppResult<Project> {
    ProjectRepo::find_owned(pool, project_id, auth.user.id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/projects
///
/// List the caller's non-deleted projects, most recently updated first.
pub async fn list(auth: AuthUser, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let projects = ProjectRepo::list_by_user(&state.pool, auth.user.id).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// POST /api/v1/projects
///
/// Create a project and, when a repository URL is supplied, enqueue the
/// migration pipeline. Returns 201 with the created row immediately; the
/// caller polls project status for migration progress.
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if let Some(subdomain) = &input.subdomain {
        if ProjectRepo::subdomain_taken(&state.pool, subdomain).await? {
            return Err(AppError::Core(CoreError::Conflict(
                "Subdomain already taken".into(),
            )));
        }
    }

    let project = ProjectRepo::create(&state.pool, auth.user.id, &input).await?;

    if project.github_repo_url.is_some() {
        JobQueueRepo::enqueue(&state.pool, JOB_MIGRATE_PROJECT, project.id).await?;
        tracing::info!(project_id = project.id, "Migration enqueued");
    }

    tracing::info!(
        project_id = project.id,
        user_id = auth.user.id,
        name = %project.name,
        "Project created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let project = find_and_authorize(&state.pool, project_id, &auth).await?;
    Ok(Json(DataResponse { data: project }))
}

/// PUT /api/v1/projects/{id}
///
/// Update user-editable fields (name, domain, runtime secrets).
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<UpdateProject>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    find_and_authorize(&state.pool, project_id, &auth).await?;

    let updated = ProjectRepo::update(&state.pool, project_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;

    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/projects/{id}
///
/// Soft delete: flips status to `deleted`, releasing the subdomain.
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, project_id, &auth).await?;
    ProjectRepo::soft_delete(&state.pool, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Subdomain availability
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SubdomainAvailability {
    pub available: bool,
    pub subdomain: String,
}

/// GET /api/v1/projects/check-subdomain/{subdomain}
pub async fn check_subdomain(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> AppResult<impl IntoResponse> {
    let subdomain = subdomain.to_lowercase();
    let taken = ProjectRepo::subdomain_taken(&state.pool, &subdomain).await?;
    Ok(Json(DataResponse {
        data: SubdomainAvailability {
            available: !taken,
            subdomain,
        },
    }))
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ProjectStats {
    pub total_fixes: i64,
    pub deployed_fixes: i64,
    pub total_deployments: i64,
    pub status_id: i16,
}

/// GET /api/v1/projects/{id}/stats
pub async fn stats(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let project = find_and_authorize(&state.pool, project_id, &auth).await?;

    let total_fixes = FixRequestRepo::count_by_project(&state.pool, project_id, None).await?;
    let deployed_fixes =
        FixRequestRepo::count_by_project(&state.pool, project_id, Some(FixStatus::Deployed))
            .await?;
    let total_deployments = DeploymentRepo::count_by_project(&state.pool, project_id).await?;

    Ok(Json(DataResponse {
        data: ProjectStats {
            total_fixes,
            deployed_fixes,
            total_deployments,
            status_id: project.status_id,
        },
    }))
}

// ---------------------------------------------------------------------------
// Nested: fixes
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{project_id}/fixes
pub async fn list_fixes(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, project_id, &auth).await?;
    let fixes = FixRequestRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: fixes }))
}

/// POST /api/v1/projects/{project_id}/fixes
///
/// Submit a change request. The quote is priced from the caller's
/// completed-fix counter (read fresh), the row is written, and triage is
/// enqueued. Returns 201 immediately.
pub async fn submit_fix(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<SubmitFix>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    find_and_authorize(&state.pool, project_id, &auth).await?;

    let completed = UserRepo::completed_fix_count(&state.pool, auth.user.id).await?;
    let price_cents = fix_price_cents(completed);

    let fix = FixRequestRepo::create(
        &state.pool,
        project_id,
        auth.user.id,
        &input.description,
        price_cents,
    )
    .await?;

    JobQueueRepo::enqueue(&state.pool, JOB_TRIAGE_FIX, fix.id).await?;

    tracing::info!(
        fix_id = fix.id,
        project_id,
        user_id = auth.user.id,
        price_cents,
        "Fix submitted, triage enqueued",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: fix })))
}

// ---------------------------------------------------------------------------
// Nested: deployments
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{project_id}/deployments
pub async fn list_deployments(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, project_id, &auth).await?;
    let deployments = DeploymentRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: deployments }))
}

/// POST /api/v1/projects/{project_id}/deployments
///
/// Manual redeploy of the main line. Triggers a real deployment when the
/// project has a hosting registration; otherwise records a queued row so
/// the request is still visible in the audit trail.
pub async fn trigger_deployment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let project = find_and_authorize(&state.pool, project_id, &auth).await?;

    let record = match (
        project.vercel_project_id.as_deref(),
        project.github_repo_full_name.as_deref(),
    ) {
        (Some(vercel_project), Some(repo)) => {
            let deployment = state
                .pipeline
                .vercel
                .create_deployment(vercel_project, repo, "main")
                .await
                .map_err(patchdock_pipeline::PipelineError::from)?;

            RecordDeployment {
                project_id,
                vercel_deployment_id: Some(deployment.id),
                commit_hash: None,
                commit_message: Some("Manual redeploy triggered".to_string()),
                branch: "main".to_string(),
                status_id: DeploymentStatus::Building.id(),
                url: deployment.url,
            }
        }
        _ => RecordDeployment {
            project_id,
            vercel_deployment_id: None,
            commit_hash: None,
            commit_message: Some("Manual redeploy triggered".to_string()),
            branch: "main".to_string(),
            status_id: DeploymentStatus::Queued.id(),
            url: None,
        },
    };

    let deployment = DeploymentRepo::record(&state.pool, &record).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: deployment })))
}
