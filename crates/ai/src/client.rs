//! Client for the Anthropic Messages API.

use serde::Deserialize;

use crate::extract::extract_json;
use crate::types::{GenerationResult, SourceFile, TriageResult};

/// Default API base; overridable for tests.
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Fast, cheap model for triage classification.
const TRIAGE_MODEL: &str = "claude-3-5-haiku-20241022";

/// Stronger model for code generation.
const GENERATION_MODEL: &str = "claude-sonnet-4-20250514";

const TRIAGE_MAX_TOKENS: u32 = 1024;
const GENERATION_MAX_TOKENS: u32 = 8192;

/// At most this many file paths from the listing go into the triage prompt.
const MAX_LISTING_ENTRIES: usize = 100;

const TRIAGE_SYSTEM_PROMPT: &str = r#"You are a code triage assistant for a web application maintenance service.
Analyze fix requests and classify them by complexity.

Complexity levels:
- "simple": Small changes - text updates, CSS tweaks, single-file fixes, config changes. Can be done in under 30 minutes.
- "complex": Multi-file changes, logic modifications, new features, API changes. Takes 1-4 hours.
- "out_of_scope": Major rewrites, new integrations, changes requiring external services setup, or requests that are unclear/impossible.

Respond in JSON only with this exact schema:
{
  "complexity": "simple" | "complex" | "out_of_scope",
  "summary": "one-line summary of what needs to change",
  "affectedFiles": ["list", "of", "likely", "file", "paths"],
  "estimatedChanges": number_of_lines,
  "confidence": 0.0_to_1.0,
  "reasoning": "brief explanation of your classification"
}"#;

const GENERATION_SYSTEM_PROMPT: &str = r#"You are an expert web developer fixing code for a React + TypeScript project.
You receive a fix request, triage information, and the relevant source files.
Your job is to generate the exact code changes needed.

Rules:
1. Only modify files that need changes
2. Preserve the existing code style, formatting, and patterns
3. Make minimal changes - don't refactor unrelated code
4. If adding new functionality, follow existing patterns in the codebase
5. Ensure TypeScript types are correct
6. Test your logic mentally before outputting

Respond in JSON only with this exact schema:
{
  "success": true,
  "changes": [
    {
      "filePath": "src/path/to/file.tsx",
      "action": "modify",
      "newContent": "complete new file content here",
      "description": "what was changed and why"
    }
  ],
  "explanation": "summary of all changes made",
  "testSuggestions": ["suggestion 1", "suggestion 2"]
}

If you cannot make the fix, respond with:
{
  "success": false,
  "changes": [],
  "explanation": "why the fix cannot be made",
  "testSuggestions": [],
  "error": "specific error reason"
}"#;

/// HTTP client for the model host.
pub struct AiClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

/// Errors from the AI capability layer.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The model host returned a non-2xx status code.
    #[error("Anthropic API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The completion text carried no parseable JSON payload.
    #[error("Unparseable model response: {0}")]
    UnparseableResponse(String),
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl AiClient {
    /// Create a client from `ANTHROPIC_API_KEY`.
    ///
    /// # Panics
    ///
    /// Panics if `ANTHROPIC_API_KEY` is not set.
    pub fn from_env() -> Self {
        let api_key =
            std::env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY must be set");
        Self::new(DEFAULT_API_BASE.to_string(), api_key)
    }

    /// Create a client against an explicit API base (tests use this).
    pub fn new(api_base: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            api_key,
        }
    }

    /// Classify a change request: complexity, summary, affected files,
    /// confidence. Malformed model output is an error -- triage has no
    /// degraded result to fall back on.
    pub async fn triage(
        &self,
        description: &str,
        file_listing: &[String],
    ) -> Result<TriageResult, AiError> {
        let listing = file_listing
            .iter()
            .take(MAX_LISTING_ENTRIES)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        let user_content = format!(
            "Fix request: \"{description}\"\n\n\
             Project files: {listing}\n\
             Tech stack: React + Vite + TypeScript + Tailwind + shadcn/ui + Supabase"
        );

        let text = self
            .complete(TRIAGE_MODEL, TRIAGE_MAX_TOKENS, TRIAGE_SYSTEM_PROMPT, &user_content)
            .await?;

        let json = extract_json(&text)
            .ok_or_else(|| AiError::UnparseableResponse(head(&text).to_string()))?;
        serde_json::from_str(json).map_err(|e| AiError::UnparseableResponse(e.to_string()))
    }

    /// Produce a structured set of file edits for a triaged request.
    ///
    /// Unlike triage, a malformed completion degrades to a
    /// `success: false` result carrying the head of the raw text, so the
    /// pipeline can persist it and fail the fix cleanly.
    pub async fn generate(
        &self,
        description: &str,
        triage: &TriageResult,
        source_files: &[SourceFile],
    ) -> Result<GenerationResult, AiError> {
        let file_context = source_files
            .iter()
            .map(|f| format!("--- {} ---\n{}", f.path, f.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let triage_json = serde_json::to_string(triage)
            .map_err(|e| AiError::UnparseableResponse(e.to_string()))?;

        let user_content = format!(
            "Fix request: \"{description}\"\n\n\
             Triage: {triage_json}\n\n\
             Source files:\n{file_context}"
        );

        let text = self
            .complete(
                GENERATION_MODEL,
                GENERATION_MAX_TOKENS,
                GENERATION_SYSTEM_PROMPT,
                &user_content,
            )
            .await?;

        let Some(json) = extract_json(&text) else {
            return Ok(GenerationResult::failure(
                "Failed to parse AI response",
                head(&text),
            ));
        };

        match serde_json::from_str(json) {
            Ok(result) => Ok(result),
            Err(_) => Ok(GenerationResult::failure(
                "Failed to parse AI response JSON",
                head(&text),
            )),
        }
    }

    // ---- private helpers ----

    /// Send one Messages API call and return the concatenated text blocks.
    async fn complete(
        &self,
        model: &str,
        max_tokens: u32,
        system: &str,
        user_content: &str,
    ) -> Result<String, AiError> {
        let body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens,
            "system": system,
            "messages": [
                { "role": "user", "content": user_content },
            ],
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }
}

/// First 500 characters of a completion, for error payloads.
fn head(text: &str) -> &str {
    match text.char_indices().nth(500) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
