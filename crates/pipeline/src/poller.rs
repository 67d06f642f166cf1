//! Deployment status reconciliation.
//!
//! Pull-based: fetches remote readiness, translates it onto the internal
//! closed vocabulary, updates the Deployment row, and promotes the parent
//! project's URL once a build is ready. This module is the only place the
//! deployment host's readiness strings are interpreted.

use std::time::Duration;

use patchdock_core::error::CoreError;
use patchdock_core::types::DbId;
use patchdock_db::models::status::DeploymentStatus;
use patchdock_db::repositories::{DeploymentRepo, ProjectRepo};
use tokio_util::sync::CancellationToken;

use crate::{PipelineContext, PipelineError};

/// How often the background sweep reconciles unsettled deployments.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Unsettled rows reconciled per sweep.
const SWEEP_BATCH: i64 = 50;

/// Translate the deployment host's readiness vocabulary onto the internal
/// closed set. Unknown or absent states conservatively map to `queued`.
pub fn map_ready_state(ready_state: Option<&str>) -> DeploymentStatus {
    match ready_state {
        Some("READY") => DeploymentStatus::Ready,
        Some("ERROR") => DeploymentStatus::Error,
        Some("CANCELED") => DeploymentStatus::Cancelled,
        Some("BUILDING") => DeploymentStatus::Building,
        _ => DeploymentStatus::Queued,
    }
}

/// Reconcile one deployment row against the deployment host.
///
/// Only a `ready` result promotes the parent project's public URL and
/// status; every other state just updates the row.
pub async fn poll_deployment_status(
    ctx: &PipelineContext,
    deployment_id: DbId,
) -> Result<DeploymentStatus, PipelineError> {
    let deployment = DeploymentRepo::find_by_id(&ctx.pool, deployment_id)
        .await?
        .ok_or(PipelineError::Core(CoreError::NotFound {
            entity: "Deployment",
            id: deployment_id,
        }))?;

    let remote_id = deployment.vercel_deployment_id.as_deref().ok_or_else(|| {
        PipelineError::Core(CoreError::InvalidState(format!(
            "deployment {deployment_id} has no remote reference"
        )))
    })?;

    let info = ctx.vercel.get_deployment(remote_id).await?;
    let status = map_ready_state(info.ready_state.as_deref());

    DeploymentRepo::set_status(&ctx.pool, deployment_id, status, info.url.as_deref()).await?;

    if status == DeploymentStatus::Ready {
        if let Some(url) = &info.url {
            ProjectRepo::promote_deployment_url(&ctx.pool, deployment.project_id, url).await?;
        }
    }

    tracing::debug!(
        deployment_id,
        remote_id,
        status = ?status,
        url = ?info.url,
        "Deployment reconciled",
    );
    Ok(status)
}

/// Run the reconciliation sweep until cancelled.
///
/// Each tick polls every unsettled deployment (bounded batch); per-row
/// failures are logged and do not stop the sweep.
pub async fn run(ctx: PipelineContext, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Deployment poller started",
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Deployment poller stopping");
                break;
            }
            _ = interval.tick() => {
                let unsettled = match DeploymentRepo::list_unsettled(&ctx.pool, SWEEP_BATCH).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        tracing::error!(error = %e, "Deployment sweep query failed");
                        continue;
                    }
                };

                for deployment in unsettled {
                    if let Err(e) = poll_deployment_status(&ctx, deployment.id).await {
                        tracing::error!(
                            deployment_id = deployment.id,
                            error = %e,
                            "Deployment reconcile failed",
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vocabulary_maps_exactly() {
        assert_eq!(map_ready_state(Some("READY")), DeploymentStatus::Ready);
        assert_eq!(map_ready_state(Some("ERROR")), DeploymentStatus::Error);
        assert_eq!(map_ready_state(Some("CANCELED")), DeploymentStatus::Cancelled);
        assert_eq!(map_ready_state(Some("BUILDING")), DeploymentStatus::Building);
        assert_eq!(map_ready_state(Some("QUEUED")), DeploymentStatus::Queued);
    }

    #[test]
    fn unknown_and_absent_states_default_to_queued() {
        assert_eq!(map_ready_state(Some("INITIALIZING")), DeploymentStatus::Queued);
        assert_eq!(map_ready_state(Some("something-new")), DeploymentStatus::Queued);
        assert_eq!(map_ready_state(None), DeploymentStatus::Queued);
    }
}
