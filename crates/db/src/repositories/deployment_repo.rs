//! Repository for the `deployments` table.
//!
//! Deployment rows are the audit trail: inserted when a build is
//! triggered, updated only by the status poller, never deleted.

use patchdock_core::types::DbId;
use sqlx::PgPool;

use crate::models::deployment::{Deployment, RecordDeployment};
use crate::models::status::{DeploymentStatus, StatusId};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, project_id, vercel_deployment_id, commit_hash, commit_message, \
    branch, status_id, url, created_at";

/// Provides operations for deployment records.
pub struct DeploymentRepo;

impl DeploymentRepo {
    /// Record a freshly triggered build.
    pub async fn record(
        pool: &PgPool,
        input: &RecordDeployment,
    ) -> Result<Deployment, sqlx::Error> {
        let query = format!(
            "INSERT INTO deployments \
                 (project_id, vercel_deployment_id, commit_hash, commit_message, \
                  branch, status_id, url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Deployment>(&query)
            .bind(input.project_id)
            .bind(&input.vercel_deployment_id)
            .bind(&input.commit_hash)
            .bind(&input.commit_message)
            .bind(&input.branch)
            .bind(input.status_id)
            .bind(&input.url)
            .fetch_one(pool)
            .await
    }

    /// Find a deployment by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Deployment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM deployments WHERE id = $1");
        sqlx::query_as::<_, Deployment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's deployments, newest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Deployment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM deployments WHERE project_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Deployment>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Update readiness + URL from the poller.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: DeploymentStatus,
        url: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE deployments SET status_id = $2, url = COALESCE($3, url) WHERE id = $1")
            .bind(id)
            .bind(status.id())
            .bind(url)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// List deployments the poller still needs to reconcile: rows with a
    /// remote reference that have not reached a terminal state.
    pub async fn list_unsettled(pool: &PgPool, limit: i64) -> Result<Vec<Deployment>, sqlx::Error> {
        let terminal: Vec<StatusId> = [
            DeploymentStatus::Ready,
            DeploymentStatus::Error,
            DeploymentStatus::Cancelled,
        ]
        .iter()
        .map(|s| s.id())
        .collect();

        let query = format!(
            "SELECT {COLUMNS} FROM deployments \
             WHERE vercel_deployment_id IS NOT NULL AND status_id != ALL($1) \
             ORDER BY created_at ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Deployment>(&query)
            .bind(&terminal)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Count a project's deployment records.
    pub async fn count_by_project(pool: &PgPool, project_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM deployments WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(pool)
            .await
    }
}
