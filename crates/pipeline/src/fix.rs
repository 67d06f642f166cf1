//! Fix pipeline orchestrator.
//!
//! Full lifecycle: triage -> payment -> AI generation + preview branch ->
//! approval -> production deploy (or rejection / failure). Each step claims
//! its starting status with a conditional write before doing anything
//! else, persists its outcome, and on capability failure leaves the fix in
//! `failed` with a human-readable error log.

use patchdock_ai::{Complexity, FileAction, SourceFile, TriageResult};
use patchdock_core::error::CoreError;
use patchdock_core::naming::{edit_commit_message, short_description, staging_branch_name};
use patchdock_core::pricing::fix_price_cents;
use patchdock_core::types::DbId;
use patchdock_db::models::deployment::RecordDeployment;
use patchdock_db::models::fix_request::{FixRequest, PreviewOutcome, TriageOutcome};
use patchdock_db::models::invoice::{RecordInvoice, INVOICE_KIND_FIX};
use patchdock_db::models::pipeline_job::{JOB_DEPLOY_FIX, JOB_GENERATE_FIX};
use patchdock_db::models::project::Project;
use patchdock_db::models::status::{DeploymentStatus, FixComplexity, FixStatus, InvoiceStatus};
use patchdock_db::models::user::User;
use patchdock_db::repositories::{
    DeploymentRepo, FixRequestRepo, InvoiceRepo, JobQueueRepo, ProjectRepo, UserRepo,
};
use patchdock_github::GitHubError;

use crate::{PipelineContext, PipelineError};

/// Cap on how many affected files are fetched as generation context.
const MAX_SOURCE_FILES: usize = 10;

/// Static skeleton listing handed to triage. A lightweight stand-in for a
/// full git tree walk; enough for the model to ground file paths.
const PROJECT_FILE_LISTING: [&str; 9] = [
    "src/",
    "src/pages/",
    "src/components/",
    "src/lib/",
    "src/hooks/",
    "public/",
    "package.json",
    "vite.config.ts",
    "tailwind.config.ts",
];

fn fix_not_found(id: DbId) -> PipelineError {
    PipelineError::Core(CoreError::NotFound {
        entity: "FixRequest",
        id,
    })
}

fn project_not_found(id: DbId) -> PipelineError {
    PipelineError::Core(CoreError::NotFound {
        entity: "Project",
        id,
    })
}

fn invalid_state(message: impl Into<String>) -> PipelineError {
    PipelineError::Core(CoreError::InvalidState(message.into()))
}

async fn load_fix(ctx: &PipelineContext, fix_id: DbId) -> Result<FixRequest, PipelineError> {
    FixRequestRepo::find_by_id(&ctx.pool, fix_id)
        .await?
        .ok_or_else(|| fix_not_found(fix_id))
}

async fn load_project(ctx: &PipelineContext, project_id: DbId) -> Result<Project, PipelineError> {
    ProjectRepo::find_by_id(&ctx.pool, project_id)
        .await?
        .ok_or_else(|| project_not_found(project_id))
}

// ---------------------------------------------------------------------------
// Triage
// ---------------------------------------------------------------------------

/// Step 1: classify a submitted fix.
///
/// Claims {submitted, quoted, failed} -> triaging, runs the AI triage with a
/// lightweight file listing, refreshes the quoted price from the owner's
/// completed-fix counter, and lands in `quoted`. Any capability failure is
/// persisted as `failed` + error log and re-raised for the runner to log.
pub async fn triage_fix(
    ctx: &PipelineContext,
    fix_id: DbId,
) -> Result<TriageResult, PipelineError> {
    let claimed = FixRequestRepo::claim_status(
        &ctx.pool,
        fix_id,
        &[FixStatus::Submitted, FixStatus::Quoted, FixStatus::Failed],
        FixStatus::Triaging,
    )
    .await?;
    if !claimed {
        return Err(invalid_state(format!(
            "fix {fix_id} is not in a triageable state"
        )));
    }

    match triage_inner(ctx, fix_id).await {
        Ok(result) => Ok(result),
        Err(e) => {
            tracing::error!(fix_id, error = %e, "Triage failed");
            FixRequestRepo::mark_failed(&ctx.pool, fix_id, &e.to_string()).await?;
            Err(e)
        }
    }
}

async fn triage_inner(
    ctx: &PipelineContext,
    fix_id: DbId,
) -> Result<TriageResult, PipelineError> {
    let fix = load_fix(ctx, fix_id).await?;
    let project = load_project(ctx, fix.project_id).await?;

    let listing: Vec<String> = PROJECT_FILE_LISTING.iter().map(|s| s.to_string()).collect();
    let result = ctx.ai.triage(&fix.description, &listing).await?;

    tracing::info!(
        fix_id,
        project_id = project.id,
        complexity = ?result.complexity,
        confidence = result.confidence,
        "Triage result",
    );

    // Re-quote fresh from the owner's completed-fix counter.
    let completed = UserRepo::completed_fix_count(&ctx.pool, fix.user_id).await?;
    FixRequestRepo::set_price(&ctx.pool, fix_id, fix_price_cents(completed)).await?;

    let outcome = TriageOutcome {
        complexity_id: complexity_id(result.complexity),
        triage_result: serde_json::to_value(&result)
            .map_err(|e| PipelineError::Core(CoreError::Internal(e.to_string())))?,
    };
    FixRequestRepo::record_triage(&ctx.pool, fix_id, &outcome).await?;

    Ok(result)
}

fn complexity_id(complexity: Complexity) -> i16 {
    match complexity {
        Complexity::Simple => FixComplexity::Simple.id(),
        Complexity::Complex => FixComplexity::Complex.id(),
        Complexity::OutOfScope => FixComplexity::OutOfScope.id(),
    }
}

// ---------------------------------------------------------------------------
// Confirm
// ---------------------------------------------------------------------------

/// Synchronous confirm: create the charge intent for a quoted fix.
///
/// Ensures the owner has a payment-customer handle, creates a charge
/// intent for the quoted price (freshly recomputed when unquoted), and
/// conditionally moves {submitted, quoted} -> awaiting_payment. Returns the
/// updated fix plus the client secret the dashboard needs to collect
/// payment. Payment completion arrives later via the webhook.
pub async fn confirm_fix(
    ctx: &PipelineContext,
    fix_id: DbId,
    user: &User,
) -> Result<(FixRequest, Option<String>), PipelineError> {
    let fix = load_fix(ctx, fix_id).await?;

    let status = FixStatus::try_from_id(fix.status_id);
    if !matches!(status, Some(FixStatus::Submitted) | Some(FixStatus::Quoted)) {
        return Err(invalid_state(format!(
            "fix {fix_id} is not in a confirmable state"
        )));
    }

    let customer_id = match &user.stripe_customer_id {
        Some(id) => id.clone(),
        None => {
            let customer = ctx
                .stripe
                .create_customer(user.id, &user.email, user.full_name.as_deref())
                .await?;
            UserRepo::set_stripe_customer(&ctx.pool, user.id, &customer.id).await?;
            customer.id
        }
    };

    let price_cents = match fix.price_cents {
        Some(price) => price,
        None => {
            let completed = UserRepo::completed_fix_count(&ctx.pool, user.id).await?;
            fix_price_cents(completed)
        }
    };

    let intent = ctx
        .stripe
        .create_fix_payment_intent(&customer_id, fix_id, price_cents)
        .await?;

    let updated = FixRequestRepo::record_payment_intent(&ctx.pool, fix_id, &intent.id)
        .await?
        .ok_or_else(|| {
            // The fix changed state while the intent was being created.
            // The orphan intent is never confirmed client-side; log it.
            tracing::warn!(fix_id, intent_id = %intent.id, "Orphaned payment intent after lost confirm race");
            invalid_state(format!("fix {fix_id} is not in a confirmable state"))
        })?;

    tracing::info!(fix_id, amount_cents = price_cents, "Fix confirmed, awaiting payment");
    Ok((updated, intent.client_secret))
}

/// Payment completion, driven by the payment webhook: mark the fix paid,
/// bump the owner's completed-fix counter, record the paid invoice, and
/// enqueue generation.
pub async fn handle_fix_payment(
    ctx: &PipelineContext,
    fix_id: DbId,
    payment_intent_id: &str,
    amount_cents: i64,
) -> Result<(), PipelineError> {
    let fix = load_fix(ctx, fix_id).await?;

    let first_delivery = FixRequestRepo::mark_paid(&ctx.pool, fix_id, payment_intent_id).await?;
    if !first_delivery {
        tracing::info!(fix_id, payment_intent_id, "Duplicate payment delivery, already handled");
        return Ok(());
    }
    UserRepo::increment_fix_count(&ctx.pool, fix.user_id).await?;

    InvoiceRepo::record(
        &ctx.pool,
        &RecordInvoice {
            user_id: fix.user_id,
            project_id: Some(fix.project_id),
            fix_request_id: Some(fix_id),
            stripe_invoice_id: None,
            stripe_payment_intent_id: Some(payment_intent_id.to_string()),
            kind: INVOICE_KIND_FIX.to_string(),
            description: Some(format!(
                "Fix: {}",
                short_description(&fix.description, 100)
            )),
            amount_cents: amount_cents as i32,
            status_id: InvoiceStatus::Paid.id(),
        },
    )
    .await?;

    JobQueueRepo::enqueue(&ctx.pool, JOB_GENERATE_FIX, fix_id).await?;

    tracing::info!(fix_id, payment_intent_id, "Fix payment received, generation enqueued");
    Ok(())
}

// ---------------------------------------------------------------------------
// Generate and preview
// ---------------------------------------------------------------------------

/// Step 2: generate the fix and stage it on a preview branch.
///
/// Claims {awaiting_payment, in_progress, failed} -> in_progress, fetches
/// the affected files, runs generation, and on success creates the staging
/// branch, applies every create/modify edit with a revision-guarded write,
/// and triggers a preview deployment when the project has a hosting
/// registration. A `success: false` generation persists `failed` without
/// touching source control.
pub async fn generate_and_preview(
    ctx: &PipelineContext,
    fix_id: DbId,
) -> Result<(), PipelineError> {
    let claimed = FixRequestRepo::claim_status(
        &ctx.pool,
        fix_id,
        &[
            FixStatus::AwaitingPayment,
            FixStatus::InProgress,
            FixStatus::Failed,
        ],
        FixStatus::InProgress,
    )
    .await?;
    if !claimed {
        return Err(invalid_state(format!(
            "fix {fix_id} is not ready for generation"
        )));
    }

    match generate_inner(ctx, fix_id).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(fix_id, error = %e, "Fix generation failed");
            FixRequestRepo::mark_failed(&ctx.pool, fix_id, &e.to_string()).await?;
            Err(e)
        }
    }
}

async fn generate_inner(ctx: &PipelineContext, fix_id: DbId) -> Result<(), PipelineError> {
    let fix = load_fix(ctx, fix_id).await?;
    let project = load_project(ctx, fix.project_id).await?;

    let repo = project.github_repo_full_name.as_deref().ok_or_else(|| {
        invalid_state(format!("project {} has no managed repository", project.id))
    })?;

    let triage: TriageResult = fix
        .triage_result
        .clone()
        .ok_or_else(|| invalid_state(format!("fix {fix_id} has no triage result")))
        .and_then(|value| {
            serde_json::from_value(value)
                .map_err(|e| PipelineError::Core(CoreError::Internal(e.to_string())))
        })?;

    // Fetch current content of the affected files; missing paths are
    // skipped, the model may have guessed wrong.
    let mut source_files = Vec::new();
    for path in triage.affected_files.iter().take(MAX_SOURCE_FILES) {
        match ctx.github.get_file(repo, path, None).await {
            Ok(file) => source_files.push(SourceFile {
                path: path.clone(),
                content: file.content,
            }),
            Err(GitHubError::NotFound(_)) => {
                tracing::debug!(fix_id, path = %path, "Affected file not readable, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let result = ctx.ai.generate(&fix.description, &triage, &source_files).await?;

    let result_json = serde_json::to_value(&result)
        .map_err(|e| PipelineError::Core(CoreError::Internal(e.to_string())))?;

    if !result.success {
        let reason = result
            .error
            .as_deref()
            .unwrap_or("AI could not generate a fix");
        tracing::warn!(fix_id, reason, "Generation returned no fix");
        FixRequestRepo::record_generation_failure(&ctx.pool, fix_id, &result_json, reason).await?;
        return Ok(());
    }

    // Stage the edits on a branch derived from the fix id.
    let branch = staging_branch_name(fix_id);
    ctx.github.create_branch(repo, &branch, None).await?;

    for edit in &result.changes {
        match edit.action {
            FileAction::Create | FileAction::Modify => {
                let existing_sha = match edit.action {
                    FileAction::Modify => {
                        match ctx.github.get_file(repo, &edit.file_path, Some(&branch)).await {
                            Ok(file) => Some(file.sha),
                            Err(GitHubError::NotFound(_)) => None,
                            Err(e) => return Err(e.into()),
                        }
                    }
                    _ => None,
                };

                ctx.github
                    .put_file(
                        repo,
                        &edit.file_path,
                        &edit.new_content,
                        &edit_commit_message(&edit.description),
                        &branch,
                        existing_sha.as_deref(),
                    )
                    .await?;
            }
            FileAction::Delete => {
                // Deletions never ship unreviewed; surfaced in the preview
                // explanation instead.
                tracing::warn!(fix_id, path = %edit.file_path, "Skipping delete edit");
            }
        }
    }

    // Preview deployment is best-effort: a project without a hosting
    // registration (or a failed trigger) still reaches preview_ready,
    // just without a URL.
    let mut preview_url = None;
    if let Some(vercel_project) = project.vercel_project_id.as_deref() {
        match ctx.vercel.create_deployment(vercel_project, repo, &branch).await {
            Ok(deployment) => preview_url = deployment.url,
            Err(e) => {
                tracing::error!(fix_id, error = %e, "Preview deployment failed");
            }
        }
    }

    let outcome = PreviewOutcome {
        generation_result: result_json,
        staging_branch: branch.clone(),
        preview_url: preview_url.clone(),
    };
    FixRequestRepo::record_preview(&ctx.pool, fix_id, &outcome).await?;

    tracing::info!(fix_id, branch = %branch, preview_url = ?preview_url, "Fix preview ready");
    Ok(())
}

// ---------------------------------------------------------------------------
// Approve / Deploy
// ---------------------------------------------------------------------------

/// Synchronous approve: claim preview_ready -> approved and enqueue the
/// production deploy. Any other status is an invalid-state error.
pub async fn approve_fix(ctx: &PipelineContext, fix_id: DbId) -> Result<FixRequest, PipelineError> {
    let claimed = FixRequestRepo::claim_status(
        &ctx.pool,
        fix_id,
        &[FixStatus::PreviewReady],
        FixStatus::Approved,
    )
    .await?;
    if !claimed {
        return Err(invalid_state(format!(
            "fix {fix_id} is not ready for approval"
        )));
    }

    JobQueueRepo::enqueue(&ctx.pool, JOB_DEPLOY_FIX, fix_id).await?;
    tracing::info!(fix_id, "Fix approved, deploy enqueued");

    load_fix(ctx, fix_id).await
}

/// Step 3: deploy an approved fix to production.
///
/// Claims {approved, failed} -> deploying, triggers a production deployment
/// from the main line when hosting is registered, records the Deployment
/// row, deletes the staging branch (best-effort), and lands in `deployed`
/// with the staging fields cleared. On failure the branch and preview stay
/// intact so the step can be retried or the fix rejected.
pub async fn deploy_fix(ctx: &PipelineContext, fix_id: DbId) -> Result<(), PipelineError> {
    let claimed = FixRequestRepo::claim_status(
        &ctx.pool,
        fix_id,
        &[FixStatus::Approved, FixStatus::Failed],
        FixStatus::Deploying,
    )
    .await?;
    if !claimed {
        return Err(invalid_state(format!(
            "fix {fix_id} is not ready to deploy"
        )));
    }

    match deploy_inner(ctx, fix_id).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(fix_id, error = %e, "Fix deploy failed");
            FixRequestRepo::mark_failed(&ctx.pool, fix_id, &e.to_string()).await?;
            Err(e)
        }
    }
}

async fn deploy_inner(ctx: &PipelineContext, fix_id: DbId) -> Result<(), PipelineError> {
    let fix = load_fix(ctx, fix_id).await?;
    let project = load_project(ctx, fix.project_id).await?;

    let staging_branch = fix
        .staging_branch
        .as_deref()
        .ok_or_else(|| invalid_state(format!("fix {fix_id} has no staging branch")))?;
    let repo = project.github_repo_full_name.as_deref().ok_or_else(|| {
        invalid_state(format!("project {} has no managed repository", project.id))
    })?;

    if let Some(vercel_project) = project.vercel_project_id.as_deref() {
        let deployment = ctx.vercel.create_deployment(vercel_project, repo, "main").await?;

        DeploymentRepo::record(
            &ctx.pool,
            &RecordDeployment {
                project_id: project.id,
                vercel_deployment_id: Some(deployment.id),
                commit_hash: None,
                commit_message: Some(format!(
                    "Fix: {}",
                    short_description(&fix.description, 100)
                )),
                branch: "main".to_string(),
                status_id: DeploymentStatus::Building.id(),
                url: deployment.url,
            },
        )
        .await?;
    }

    // Branch cleanup has no correctness impact; log and move on.
    if let Err(e) = ctx.github.delete_branch(repo, staging_branch).await {
        tracing::warn!(fix_id, branch = %staging_branch, error = %e, "Staging branch cleanup failed");
    }

    FixRequestRepo::mark_deployed(&ctx.pool, fix_id).await?;
    tracing::info!(fix_id, "Fix deployed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Reject
// ---------------------------------------------------------------------------

/// Synchronous reject: claim preview_ready -> rejected (clearing the
/// staging fields in the same write), then delete the staging branch
/// best-effort. The precondition lives here, not in the HTTP layer.
pub async fn reject_fix(ctx: &PipelineContext, fix_id: DbId) -> Result<(), PipelineError> {
    let fix = load_fix(ctx, fix_id).await?;
    let project = load_project(ctx, fix.project_id).await?;

    let staging_branch = fix.staging_branch.clone();

    let claimed = FixRequestRepo::claim_rejected(&ctx.pool, fix_id).await?;
    if !claimed {
        return Err(invalid_state(format!(
            "fix {fix_id} is not in a rejectable state"
        )));
    }

    if let (Some(branch), Some(repo)) =
        (staging_branch.as_deref(), project.github_repo_full_name.as_deref())
    {
        if let Err(e) = ctx.github.delete_branch(repo, branch).await {
            tracing::warn!(fix_id, branch = %branch, error = %e, "Staging branch cleanup failed");
        }
    }

    tracing::info!(fix_id, "Fix rejected");
    Ok(())
}
