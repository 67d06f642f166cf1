//! Repository for the `projects` table.
//!
//! Projects soft-delete via the `deleted` status; every read excludes
//! deleted rows unless stated otherwise.

use patchdock_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::models::status::{ProjectStatus, StatusId};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, user_id, name, status_id, github_repo_url, github_repo_full_name, \
    supabase_url, supabase_anon_key, vercel_project_id, vercel_deployment_url, \
    subdomain, custom_domain, created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project in `onboarding` status, returning the row.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects \
                 (user_id, name, status_id, github_repo_url, supabase_url, \
                  supabase_anon_key, subdomain, custom_domain) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(user_id)
            .bind(&input.name)
            .bind(ProjectStatus::Onboarding.id())
            .bind(&input.github_repo_url)
            .bind(&input.supabase_url)
            .bind(&input.supabase_anon_key)
            .bind(&input.subdomain)
            .bind(&input.custom_domain)
            .fetch_one(pool)
            .await
    }

    /// Find a non-deleted project by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects WHERE id = $1 AND status_id != $2"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(ProjectStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    /// Find a non-deleted project by ID, scoped to its owner.
    pub async fn find_owned(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects \
             WHERE id = $1 AND user_id = $2 AND status_id != $3"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(user_id)
            .bind(ProjectStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    /// List a user's non-deleted projects, most recently updated first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects \
             WHERE user_id = $1 AND status_id != $2 \
             ORDER BY updated_at DESC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(user_id)
            .bind(ProjectStatus::Deleted.id())
            .fetch_all(pool)
            .await
    }

    /// Whether a subdomain is already claimed by any non-deleted project.
    pub async fn subdomain_taken(pool: &PgPool, subdomain: &str) -> Result<bool, sqlx::Error> {
        let existing: Option<DbId> = sqlx::query_scalar(
            "SELECT id FROM projects WHERE subdomain = $1 AND status_id != $2 LIMIT 1",
        )
        .bind(subdomain)
        .bind(ProjectStatus::Deleted.id())
        .fetch_optional(pool)
        .await?;
        Ok(existing.is_some())
    }

    /// Update user-editable fields. Only non-`None` fields are applied.
    ///
    /// Returns `None` if no non-deleted row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET \
                name = COALESCE($2, name), \
                supabase_url = COALESCE($3, supabase_url), \
                supabase_anon_key = COALESCE($4, supabase_anon_key), \
                subdomain = COALESCE($5, subdomain), \
                custom_domain = COALESCE($6, custom_domain), \
                updated_at = NOW() \
             WHERE id = $1 AND status_id != $7 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.supabase_url)
            .bind(&input.supabase_anon_key)
            .bind(&input.subdomain)
            .bind(&input.custom_domain)
            .bind(ProjectStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    /// Set the project lifecycle status.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: ProjectStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE projects SET status_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.id())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Conditionally transition status: the write applies only when the row
    /// is still in one of the expected states. Returns `true` when this
    /// caller won the transition.
    pub async fn claim_status(
        pool: &PgPool,
        id: DbId,
        expected: &[ProjectStatus],
        next: ProjectStatus,
    ) -> Result<bool, sqlx::Error> {
        let expected_ids: Vec<StatusId> = expected.iter().map(|s| s.id()).collect();
        let result = sqlx::query(
            "UPDATE projects SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = ANY($3)",
        )
        .bind(id)
        .bind(next.id())
        .bind(&expected_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist the managed repository reference (migration step 4).
    pub async fn set_managed_repo(
        pool: &PgPool,
        id: DbId,
        full_name: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE projects SET github_repo_full_name = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(full_name)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a project live: hosting registration id, public URL, `active`.
    pub async fn set_hosting(
        pool: &PgPool,
        id: DbId,
        vercel_project_id: &str,
        deployment_url: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE projects SET \
                status_id = $2, \
                vercel_project_id = $3, \
                vercel_deployment_url = $4, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(ProjectStatus::Active.id())
        .bind(vercel_project_id)
        .bind(deployment_url)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Promote the public URL once a deployment reports ready.
    pub async fn promote_deployment_url(
        pool: &PgPool,
        id: DbId,
        url: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE projects SET \
                vercel_deployment_url = $2, \
                status_id = $3, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .bind(ProjectStatus::Active.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Suspend every active project a user owns (hosting subscription
    /// ended). Returns the number of projects suspended.
    pub async fn suspend_all_active(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET status_id = $2, updated_at = NOW() \
             WHERE user_id = $1 AND status_id = $3",
        )
        .bind(user_id)
        .bind(ProjectStatus::Suspended.id())
        .bind(ProjectStatus::Active.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Soft-delete a project. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id != $2",
        )
        .bind(id)
        .bind(ProjectStatus::Deleted.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
