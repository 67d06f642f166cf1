//! Project entity model and DTOs.

use patchdock_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::status::StatusId;

/// A row from the `projects` table: one hosted unit.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub status_id: StatusId,
    pub github_repo_url: Option<String>,
    /// Canonical `owner/name` of the managed copy once migration has run.
    pub github_repo_full_name: Option<String>,
    pub supabase_url: Option<String>,
    #[serde(skip_serializing)]
    pub supabase_anon_key: Option<String>,
    pub vercel_project_id: Option<String>,
    pub vercel_deployment_url: Option<String>,
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(url)]
    pub github_repo_url: Option<String>,
    #[validate(url)]
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    #[validate(length(min = 3, max = 30), regex(path = *SUBDOMAIN_PATTERN))]
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
}

/// DTO for updating an existing project. All fields are optional.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProject {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(url)]
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    #[validate(length(min = 3, max = 30), regex(path = *SUBDOMAIN_PATTERN))]
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
}

/// Lowercase alphanumeric with hyphens; claimed subdomains become part of a
/// public hostname.
pub static SUBDOMAIN_PATTERN: std::sync::LazyLock<regex::Regex> =
    std::sync::LazyLock::new(|| regex::Regex::new(r"^[a-z0-9-]+$").expect("pattern compiles"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdomain_pattern_accepts_valid() {
        assert!(SUBDOMAIN_PATTERN.is_match("my-shop-42"));
    }

    #[test]
    fn subdomain_pattern_rejects_invalid() {
        assert!(!SUBDOMAIN_PATTERN.is_match("My-Shop"));
        assert!(!SUBDOMAIN_PATTERN.is_match("shop.example"));
        assert!(!SUBDOMAIN_PATTERN.is_match("shop app"));
    }
}
