//! Deployment entity model.

use patchdock_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::status::StatusId;

/// A row from the `deployments` table: an immutable record of one
/// triggered build. Only the status poller mutates it (status + url);
/// rows are never deleted -- they are the audit trail.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Deployment {
    pub id: DbId,
    pub project_id: DbId,
    pub vercel_deployment_id: Option<String>,
    pub commit_hash: Option<String>,
    pub commit_message: Option<String>,
    pub branch: String,
    pub status_id: StatusId,
    pub url: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for recording a freshly triggered build.
#[derive(Debug, Clone)]
pub struct RecordDeployment {
    pub project_id: DbId,
    pub vercel_deployment_id: Option<String>,
    pub commit_hash: Option<String>,
    pub commit_message: Option<String>,
    pub branch: String,
    pub status_id: StatusId,
    pub url: Option<String>,
}
