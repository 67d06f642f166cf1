//! Deterministic names derived from entities: hosting slugs, staging
//! branch names, commit messages.

use crate::types::DbId;

/// Maximum length of a hosting project slug.
const MAX_SLUG_LEN: usize = 50;

/// Prefix for fix staging branches.
const STAGING_BRANCH_PREFIX: &str = "fix/";

/// Derive a URL-safe hosting slug from a repository name.
///
/// Lowercases, replaces every character outside `[a-z0-9-]` with `-`, and
/// truncates to 50 characters. Returns `None` when nothing usable remains
/// (caller falls back to [`fallback_slug`]).
pub fn project_slug(repo_name: &str) -> Option<String> {
    let slug: String = repo_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();

    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        return None;
    }

    Some(slug.chars().take(MAX_SLUG_LEN).collect())
}

/// Fallback slug when the repository name yields nothing usable.
pub fn fallback_slug(project_id: DbId) -> String {
    format!("project-{project_id:08x}")
}

/// Deterministic staging branch name for a fix request.
///
/// Derived from the fix identifier alone so re-running the generation step
/// for the same fix targets the same branch.
pub fn staging_branch_name(fix_id: DbId) -> String {
    format!("{STAGING_BRANCH_PREFIX}{fix_id:08x}")
}

/// Commit message for one applied file edit.
pub fn edit_commit_message(description: &str) -> String {
    format!("[patchdock] {description}")
}

/// Truncate a fix description for use in deployment commit messages.
pub fn short_description(description: &str, max: usize) -> &str {
    match description.char_indices().nth(max) {
        Some((idx, _)) => &description[..idx],
        None => description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lowercases_and_replaces() {
        assert_eq!(project_slug("My Store_App").unwrap(), "my-store-app");
    }

    #[test]
    fn slug_truncates_to_fifty() {
        let long = "a".repeat(80);
        assert_eq!(project_slug(&long).unwrap().len(), 50);
    }

    #[test]
    fn slug_strips_edge_dashes() {
        assert_eq!(project_slug("--edgy--").unwrap(), "edgy");
    }

    #[test]
    fn slug_empty_input_is_none() {
        assert!(project_slug("***").is_none());
        assert!(project_slug("").is_none());
    }

    #[test]
    fn fallback_is_hex_padded() {
        assert_eq!(fallback_slug(255), "project-000000ff");
    }

    #[test]
    fn branch_name_is_deterministic() {
        assert_eq!(staging_branch_name(4096), "fix/00001000");
        assert_eq!(staging_branch_name(4096), staging_branch_name(4096));
    }

    #[test]
    fn branch_names_differ_per_fix() {
        assert_ne!(staging_branch_name(1), staging_branch_name(2));
    }

    #[test]
    fn short_description_respects_char_boundaries() {
        assert_eq!(short_description("héllo wörld", 5), "héllo");
        assert_eq!(short_description("tiny", 50), "tiny");
    }
}
