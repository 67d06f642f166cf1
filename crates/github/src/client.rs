//! REST client for the GitHub HTTP API.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use patchdock_core::repo_ref::split_full_name;
use serde::Deserialize;

/// Suffix appended to forked repository names so managed copies are
/// recognisable in the org.
const FORK_NAME_SUFFIX: &str = "-patchdock";

/// Default API base; overridable for tests.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// HTTP client for the GitHub REST API, scoped to one managed organization.
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
    /// The org (or user) that owns patchdock-managed repository copies.
    managed_owner: String,
}

/// Errors from the GitHub API layer.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// GitHub returned a non-2xx status code.
    #[error("GitHub API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The requested resource does not exist (404).
    #[error("GitHub resource not found: {0}")]
    NotFound(String),

    /// The target already exists (fork of an already-forked repo).
    #[error("GitHub resource already exists: {0}")]
    AlreadyExists(String),

    /// A write carried a stale revision handle (409/422 on contents PUT).
    #[error("GitHub write conflict: {0}")]
    Conflict(String),

    /// A repository reference was not `owner/name`.
    #[error("Invalid repository reference: {0}")]
    InvalidRef(String),
}

/// Repository metadata from `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    pub default_branch: String,
    pub private: bool,
    pub language: Option<String>,
}

/// The managed copy created by a fork.
#[derive(Debug, Clone, Deserialize)]
pub struct ForkedRepo {
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    pub default_branch: String,
}

/// A file read from a repository: decoded content plus the blob sha used
/// as the revision handle for conditional writes.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub content: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: Option<String>,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

impl GitHubClient {
    /// Create a client from `GITHUB_TOKEN` and `GITHUB_OWNER`.
    ///
    /// # Panics
    ///
    /// Panics if `GITHUB_TOKEN` is not set; a missing token would fail on
    /// the first pipeline run anyway, so fail at startup instead.
    pub fn from_env() -> Self {
        let token = std::env::var("GITHUB_TOKEN").expect("GITHUB_TOKEN must be set");
        let managed_owner =
            std::env::var("GITHUB_OWNER").expect("GITHUB_OWNER must be set");
        Self::new(DEFAULT_API_BASE.to_string(), token, managed_owner)
    }

    /// Create a client against an explicit API base (tests use this).
    pub fn new(api_base: String, token: String, managed_owner: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            token,
            managed_owner,
        }
    }

    /// The org that owns managed repository copies.
    pub fn managed_owner(&self) -> &str {
        &self.managed_owner
    }

    /// Fetch repository metadata (existence/access check included).
    pub async fn get_repo(&self, full_name: &str) -> Result<RepoInfo, GitHubError> {
        let (owner, repo) = self.split(full_name)?;
        let response = self
            .request(reqwest::Method::GET, &format!("/repos/{owner}/{repo}"))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Fork a repository into the managed organization.
    ///
    /// The fork gets a `-patchdock` name suffix and only the default
    /// branch. A repository that has already been forked surfaces as
    /// [`GitHubError::AlreadyExists`] so the migration pipeline can fall
    /// back to the original reference.
    pub async fn fork_repo(&self, full_name: &str) -> Result<ForkedRepo, GitHubError> {
        let (owner, repo) = self.split(full_name)?;

        let mut body = serde_json::json!({
            "name": format!("{repo}{FORK_NAME_SUFFIX}"),
            "default_branch_only": true,
        });
        if self.managed_owner != owner {
            body["organization"] = serde_json::Value::String(self.managed_owner.clone());
        }

        let response = self
            .request(reqwest::Method::POST, &format!("/repos/{owner}/{repo}/forks"))
            .json(&body)
            .send()
            .await?;

        match response.status().as_u16() {
            403 | 422 => {
                let body = Self::body_text(response).await;
                Err(GitHubError::AlreadyExists(body))
            }
            _ => Self::parse_response(response).await,
        }
    }

    /// Create a branch from the head of `from_branch` (default `main`).
    pub async fn create_branch(
        &self,
        full_name: &str,
        branch: &str,
        from_branch: Option<&str>,
    ) -> Result<(), GitHubError> {
        let (owner, repo) = self.split(full_name)?;
        let base = from_branch.unwrap_or("main");

        // Resolve the base branch head sha.
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/repos/{owner}/{repo}/git/ref/heads/{base}"),
            )
            .send()
            .await?;
        if response.status().as_u16() == 404 {
            return Err(GitHubError::NotFound(format!(
                "base branch {base} on {full_name}"
            )));
        }
        let base_ref: RefResponse = Self::parse_response(response).await?;

        let body = serde_json::json!({
            "ref": format!("refs/heads/{branch}"),
            "sha": base_ref.object.sha,
        });
        let response = self
            .request(reqwest::Method::POST, &format!("/repos/{owner}/{repo}/git/refs"))
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Delete a branch. Missing branches surface as [`GitHubError::NotFound`]
    /// (callers treat cleanup as best-effort).
    pub async fn delete_branch(&self, full_name: &str, branch: &str) -> Result<(), GitHubError> {
        let (owner, repo) = self.split(full_name)?;
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/repos/{owner}/{repo}/git/refs/heads/{branch}"),
            )
            .send()
            .await?;
        if response.status().as_u16() == 404 {
            return Err(GitHubError::NotFound(format!("branch {branch} on {full_name}")));
        }
        Self::check_status(response).await
    }

    /// Read a file's decoded content and blob sha from the given branch
    /// (repository default branch when `None`).
    pub async fn get_file(
        &self,
        full_name: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<FileContent, GitHubError> {
        let (owner, repo) = self.split(full_name)?;

        let mut request = self.request(
            reqwest::Method::GET,
            &format!("/repos/{owner}/{repo}/contents/{path}"),
        );
        if let Some(branch) = branch {
            request = request.query(&[("ref", branch)]);
        }

        let response = request.send().await?;
        if response.status().as_u16() == 404 {
            return Err(GitHubError::NotFound(format!("{path} on {full_name}")));
        }
        let contents: ContentsResponse = Self::parse_response(response).await?;

        if contents.kind != "file" {
            return Err(GitHubError::NotFound(format!("{path} is not a file")));
        }

        let encoded: String = contents
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let decoded = BASE64
            .decode(encoded)
            .map_err(|e| GitHubError::Api {
                status: 200,
                body: format!("undecodable file content for {path}: {e}"),
            })?;
        let content = String::from_utf8_lossy(&decoded).into_owned();

        Ok(FileContent {
            content,
            sha: contents.sha,
        })
    }

    /// Create or update a file on a branch, committing directly.
    ///
    /// `expected_sha` is the revision guard: when the file's current blob
    /// sha no longer matches, GitHub rejects the write and it surfaces as
    /// [`GitHubError::Conflict`] -- a stale write never lands silently.
    pub async fn put_file(
        &self,
        full_name: &str,
        path: &str,
        content: &str,
        commit_message: &str,
        branch: &str,
        expected_sha: Option<&str>,
    ) -> Result<(), GitHubError> {
        let (owner, repo) = self.split(full_name)?;

        let mut body = serde_json::json!({
            "message": commit_message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": branch,
        });
        if let Some(sha) = expected_sha {
            body["sha"] = serde_json::Value::String(sha.to_string());
        }

        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/repos/{owner}/{repo}/contents/{path}"),
            )
            .json(&body)
            .send()
            .await?;

        match response.status().as_u16() {
            409 | 422 => {
                let body = Self::body_text(response).await;
                Err(GitHubError::Conflict(format!("{path} on {branch}: {body}")))
            }
            _ => Self::check_status(response).await,
        }
    }

    // ---- private helpers ----

    fn split<'a>(&self, full_name: &'a str) -> Result<(&'a str, &'a str), GitHubError> {
        split_full_name(full_name).map_err(|e| GitHubError::InvalidRef(e.to_string()))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.api_base))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "patchdock")
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`GitHubError::Api`] containing the
    /// status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GitHubError> {
        let status = response.status();
        if !status.is_success() {
            let body = Self::body_text(response).await;
            return Err(GitHubError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GitHubError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), GitHubError> {
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn body_text(response: reqwest::Response) -> String {
        response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string())
    }
}
