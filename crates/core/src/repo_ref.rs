//! Canonicalisation of externally supplied repository references.
//!
//! Users paste GitHub URLs in many shapes (`https://github.com/owner/repo`,
//! with `.git`, with trailing paths, or already `owner/repo`). Everything
//! downstream works with the canonical `owner/name` form.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::CoreError;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"github\.com/([^/\s]+/[^/\s]+?)(?:\.git)?(?:/.*)?$")
            .expect("repo URL pattern must compile")
    })
}

fn short_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^/\s]+/[^/\s]+$").expect("owner/name pattern must compile")
    })
}

/// Parse a repository URL (or bare `owner/name`) into the canonical
/// `owner/name` form.
pub fn parse_repo_url(url: &str) -> Result<String, CoreError> {
    let trimmed = url.trim();

    if let Some(captures) = url_pattern().captures(trimmed) {
        let full_name = captures[1].trim_end_matches(".git");
        return Ok(full_name.to_string());
    }

    if short_pattern().is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(CoreError::Validation(format!(
        "Not a recognisable GitHub repository URL: {trimmed}"
    )))
}

/// Split a canonical `owner/name` reference into its two halves.
pub fn split_full_name(full_name: &str) -> Result<(&str, &str), CoreError> {
    match full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(CoreError::Validation(format!(
            "Repository reference must be owner/name, got: {full_name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_url() {
        assert_eq!(
            parse_repo_url("https://github.com/acme/storefront").unwrap(),
            "acme/storefront"
        );
    }

    #[test]
    fn url_with_git_suffix() {
        assert_eq!(
            parse_repo_url("https://github.com/acme/storefront.git").unwrap(),
            "acme/storefront"
        );
    }

    #[test]
    fn url_with_trailing_path() {
        assert_eq!(
            parse_repo_url("https://github.com/acme/storefront/tree/main/src").unwrap(),
            "acme/storefront"
        );
    }

    #[test]
    fn bare_owner_name() {
        assert_eq!(parse_repo_url("acme/storefront").unwrap(), "acme/storefront");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_repo_url("not a url").is_err());
        assert!(parse_repo_url("https://gitlab.com/acme/storefront").is_err());
        assert!(parse_repo_url("").is_err());
    }

    #[test]
    fn split_valid() {
        assert_eq!(split_full_name("acme/storefront").unwrap(), ("acme", "storefront"));
    }

    #[test]
    fn split_rejects_malformed() {
        assert!(split_full_name("acme").is_err());
        assert!(split_full_name("acme/").is_err());
        assert!(split_full_name("/storefront").is_err());
        assert!(split_full_name("a/b/c").is_err());
    }
}
