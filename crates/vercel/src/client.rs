//! REST client for the Vercel HTTP API (v6+ endpoints).

use patchdock_core::repo_ref::split_full_name;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Default API base; overridable for tests.
const DEFAULT_API_BASE: &str = "https://api.vercel.com";

/// Env var targets applied to forwarded runtime configuration.
const ENV_TARGETS: [&str; 3] = ["production", "preview", "development"];

/// HTTP client for the Vercel API, optionally scoped to a team.
pub struct VercelClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
    team_id: Option<String>,
}

/// Errors from the Vercel API layer.
#[derive(Debug, thiserror::Error)]
pub enum VercelError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Vercel returned a non-2xx status code.
    #[error("Vercel API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A repository reference was not `owner/name`.
    #[error("Invalid repository reference: {0}")]
    InvalidRef(String),
}

/// A registered hosting project.
#[derive(Debug, Clone, Deserialize)]
pub struct VercelProject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct RawDeployment {
    id: String,
    url: Option<String>,
    #[serde(rename = "readyState")]
    ready_state: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

/// A deployment freshly triggered from a branch.
#[derive(Debug, Clone)]
pub struct TriggeredDeployment {
    pub id: String,
    /// Full `https://` URL when Vercel has already assigned one.
    pub url: Option<String>,
    pub ready_state: Option<String>,
}

/// Current state of a deployment.
#[derive(Debug, Clone)]
pub struct DeploymentInfo {
    pub id: String,
    pub url: Option<String>,
    pub ready_state: Option<String>,
    pub error_message: Option<String>,
}

impl VercelClient {
    /// Create a client from `VERCEL_TOKEN` and optional `VERCEL_TEAM_ID`.
    ///
    /// # Panics
    ///
    /// Panics if `VERCEL_TOKEN` is not set.
    pub fn from_env() -> Self {
        let token = std::env::var("VERCEL_TOKEN").expect("VERCEL_TOKEN must be set");
        let team_id = std::env::var("VERCEL_TEAM_ID").ok().filter(|v| !v.is_empty());
        Self::new(DEFAULT_API_BASE.to_string(), token, team_id)
    }

    /// Create a client against an explicit API base (tests use this).
    pub fn new(api_base: String, token: String, team_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            token,
            team_id,
        }
    }

    /// Register a new hosting project linked to a GitHub repository,
    /// forwarding runtime env vars as encrypted configuration.
    pub async fn create_project(
        &self,
        name: &str,
        repo_full_name: &str,
        framework: &str,
        env_vars: &BTreeMap<String, String>,
    ) -> Result<VercelProject, VercelError> {
        let mut body = serde_json::json!({
            "name": name,
            "framework": framework,
            "gitRepository": {
                "type": "github",
                "repo": repo_full_name,
            },
        });

        if !env_vars.is_empty() {
            let variables: Vec<serde_json::Value> = env_vars
                .iter()
                .map(|(key, value)| {
                    serde_json::json!({
                        "key": key,
                        "value": value,
                        "target": ENV_TARGETS,
                        "type": "encrypted",
                    })
                })
                .collect();
            body["environmentVariables"] = serde_json::Value::Array(variables);
        }

        let response = self
            .request(reqwest::Method::POST, "/v10/projects")
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Trigger a deployment of `branch`. Deployments from `main` target
    /// production; every other branch produces a preview.
    pub async fn create_deployment(
        &self,
        project_name: &str,
        repo_full_name: &str,
        branch: &str,
    ) -> Result<TriggeredDeployment, VercelError> {
        let (owner, repo) = split_full_name(repo_full_name)
            .map_err(|e| VercelError::InvalidRef(e.to_string()))?;

        let mut body = serde_json::json!({
            "name": project_name,
            "project": project_name,
            "gitSource": {
                "type": "github",
                "org": owner,
                "repo": repo,
                "ref": branch,
            },
        });
        if branch == "main" {
            body["target"] = serde_json::Value::String("production".to_string());
        }

        let response = self
            .request(reqwest::Method::POST, "/v13/deployments")
            .json(&body)
            .send()
            .await?;
        let raw: RawDeployment = Self::parse_response(response).await?;

        Ok(TriggeredDeployment {
            id: raw.id,
            url: raw.url.map(|u| format!("https://{u}")),
            ready_state: raw.ready_state,
        })
    }

    /// Fetch current deployment readiness.
    pub async fn get_deployment(&self, deployment_id: &str) -> Result<DeploymentInfo, VercelError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/v13/deployments/{deployment_id}"),
            )
            .send()
            .await?;
        let raw: RawDeployment = Self::parse_response(response).await?;

        Ok(DeploymentInfo {
            id: raw.id,
            url: raw.url.map(|u| format!("https://{u}")),
            ready_state: raw.ready_state,
            error_message: raw.error_message,
        })
    }

    // ---- private helpers ----

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.api_base))
            .bearer_auth(&self.token);
        if let Some(team_id) = &self.team_id {
            request = request.query(&[("teamId", team_id)]);
        }
        request
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`VercelError::Api`] with the status and
    /// body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, VercelError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(VercelError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, VercelError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
