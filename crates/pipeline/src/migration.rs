//! Migration pipeline orchestrator.
//!
//! A single forward pipeline: validate the supplied repository reference,
//! duplicate it into the managed organization, register a hosting project,
//! trigger the initial deployment, and mark the project live. Any failure
//! reverts the project to `onboarding` and is returned in the outcome
//! summary -- never thrown past the first status flip, which must stay
//! observable even when everything after it fails.

use std::collections::BTreeMap;

use patchdock_core::error::CoreError;
use patchdock_core::naming::{fallback_slug, project_slug};
use patchdock_core::repo_ref::{parse_repo_url, split_full_name};
use patchdock_core::types::DbId;
use patchdock_db::models::deployment::RecordDeployment;
use patchdock_db::models::status::{DeploymentStatus, ProjectStatus};
use patchdock_db::repositories::{DeploymentRepo, ProjectRepo};
use patchdock_github::{ForkedRepo, GitHubError};

use crate::{PipelineContext, PipelineError};

/// Framework preset forwarded to the hosting registration.
const FRAMEWORK: &str = "vite";

/// Commit message recorded for the initial deployment.
const INITIAL_COMMIT_MESSAGE: &str = "Initial patchdock migration";

/// Success/failure summary returned to the runner (and logged); the
/// durable state lives on the project row.
#[derive(Debug)]
pub struct MigrationOutcome {
    pub success: bool,
    pub github_repo_full_name: Option<String>,
    pub vercel_project_id: Option<String>,
    pub vercel_url: Option<String>,
    pub error: Option<String>,
}

impl MigrationOutcome {
    fn failure(error: String) -> Self {
        Self {
            success: false,
            github_repo_full_name: None,
            vercel_project_id: None,
            vercel_url: None,
            error: Some(error),
        }
    }
}

/// Run the full migration pipeline for a project.
///
/// Reads every input (repository URL, runtime secrets) from the project
/// row, so a retry after any failure recomputes from persisted state.
pub async fn run_migration(ctx: &PipelineContext, project_id: DbId) -> MigrationOutcome {
    // Step 1: the status flip is the one effect that must always be
    // observable, so it happens before anything fallible.
    let claimed = match ProjectRepo::claim_status(
        &ctx.pool,
        project_id,
        &[ProjectStatus::Onboarding, ProjectStatus::Migrating],
        ProjectStatus::Migrating,
    )
    .await
    {
        Ok(claimed) => claimed,
        Err(e) => return MigrationOutcome::failure(e.to_string()),
    };
    if !claimed {
        return MigrationOutcome::failure(format!(
            "project {project_id} is not in a migratable state"
        ));
    }

    match migrate_inner(ctx, project_id).await {
        Ok(outcome) => {
            tracing::info!(project_id, "Migration complete");
            outcome
        }
        Err(e) => {
            tracing::error!(project_id, error = %e, "Migration failed");
            // Revert to onboarding: migrations are retried by
            // re-submission, not by a failed status.
            if let Err(revert) =
                ProjectRepo::set_status(&ctx.pool, project_id, ProjectStatus::Onboarding).await
            {
                tracing::error!(project_id, error = %revert, "Failed to revert project status");
            }
            MigrationOutcome::failure(e.to_string())
        }
    }
}

async fn migrate_inner(
    ctx: &PipelineContext,
    project_id: DbId,
) -> Result<MigrationOutcome, PipelineError> {
    let project = ProjectRepo::find_by_id(&ctx.pool, project_id)
        .await?
        .ok_or(PipelineError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;

    let repo_url = project.github_repo_url.as_deref().ok_or_else(|| {
        PipelineError::Core(CoreError::Validation(format!(
            "project {project_id} has no repository URL"
        )))
    })?;

    // Step 2: canonicalise and validate the supplied reference.
    let repo_full_name = parse_repo_url(repo_url).map_err(PipelineError::Core)?;
    let repo_info = ctx.github.get_repo(&repo_full_name).await?;
    tracing::info!(
        project_id,
        repo = %repo_info.full_name,
        language = ?repo_info.language,
        "Repository validated",
    );

    // Step 3: duplicate into the managed org. An existing copy is a
    // compensating fallback, not a failure -- the original reference
    // becomes the managed reference and migration stays idempotent
    // under retry.
    let managed = match ctx.github.fork_repo(&repo_full_name).await {
        Ok(forked) => forked,
        Err(GitHubError::AlreadyExists(reason)) => {
            tracing::info!(
                project_id,
                repo = %repo_full_name,
                reason = %reason,
                "Duplicate already exists, using original reference",
            );
            ForkedRepo {
                full_name: repo_info.full_name.clone(),
                html_url: repo_info.html_url.clone(),
                clone_url: repo_info.clone_url.clone(),
                default_branch: repo_info.default_branch.clone(),
            }
        }
        Err(e) => return Err(e.into()),
    };

    // Step 4: persist the managed reference.
    ProjectRepo::set_managed_repo(&ctx.pool, project_id, &managed.full_name).await?;

    // Step 5: register the hosting project, forwarding runtime secrets.
    let slug = split_full_name(&managed.full_name)
        .ok()
        .and_then(|(_, name)| project_slug(name))
        .unwrap_or_else(|| fallback_slug(project_id));

    let mut env_vars = BTreeMap::new();
    if let Some(url) = &project.supabase_url {
        env_vars.insert("VITE_SUPABASE_URL".to_string(), url.clone());
    }
    if let Some(key) = &project.supabase_anon_key {
        env_vars.insert("VITE_SUPABASE_ANON_KEY".to_string(), key.clone());
    }

    let vercel_project = ctx
        .vercel
        .create_project(&slug, &managed.full_name, FRAMEWORK, &env_vars)
        .await?;
    tracing::info!(project_id, vercel_project_id = %vercel_project.id, slug = %slug, "Hosting project registered");

    // Step 6: trigger the initial deployment from the default branch.
    let deployment = ctx
        .vercel
        .create_deployment(&vercel_project.name, &managed.full_name, &managed.default_branch)
        .await?;
    tracing::info!(project_id, deployment_id = %deployment.id, url = ?deployment.url, "Initial deployment triggered");

    // Step 7: record the deployment.
    DeploymentRepo::record(
        &ctx.pool,
        &RecordDeployment {
            project_id,
            vercel_deployment_id: Some(deployment.id.clone()),
            commit_hash: None,
            commit_message: Some(INITIAL_COMMIT_MESSAGE.to_string()),
            branch: managed.default_branch.clone(),
            status_id: DeploymentStatus::Building.id(),
            url: deployment.url.clone(),
        },
    )
    .await?;

    // Step 8: mark the project live.
    ProjectRepo::set_hosting(
        &ctx.pool,
        project_id,
        &vercel_project.id,
        deployment.url.as_deref(),
    )
    .await?;

    Ok(MigrationOutcome {
        success: true,
        github_repo_full_name: Some(managed.full_name),
        vercel_project_id: Some(vercel_project.id),
        vercel_url: deployment.url,
        error: None,
    })
}
