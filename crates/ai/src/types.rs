//! Structured results exchanged with the model.

use serde::{Deserialize, Serialize};

/// Triage complexity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Complex,
    OutOfScope,
}

/// Structured triage output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResult {
    pub complexity: Complexity,
    /// One-line summary of what needs to change.
    pub summary: String,
    /// Likely file paths the fix touches.
    #[serde(default)]
    pub affected_files: Vec<String>,
    #[serde(default)]
    pub estimated_changes: Option<i64>,
    /// Model self-assessed confidence in [0, 1].
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// What to do with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Create,
    Modify,
    Delete,
}

/// One file edit produced by generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEdit {
    pub file_path: String,
    pub action: FileAction,
    /// Complete new file content (empty for deletes).
    #[serde(default)]
    pub new_content: String,
    /// Human-readable description, used as the commit message.
    pub description: String,
}

/// Structured generation output. `success: false` carries a reason in
/// `error` and an empty edit list -- the pipeline persists it verbatim and
/// creates no branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    #[serde(default)]
    pub changes: Vec<FileEdit>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub test_suggestions: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerationResult {
    /// A failure result built locally (e.g. unparseable model output).
    pub fn failure(explanation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            changes: Vec::new(),
            explanation: explanation.into(),
            test_suggestions: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// A source file handed to generation as context.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triage_result_parses_from_model_json() {
        let json = r#"{
            "complexity": "simple",
            "summary": "Update the hero headline",
            "affectedFiles": ["src/components/Hero.tsx"],
            "estimatedChanges": 3,
            "confidence": 0.92,
            "reasoning": "single-file text change"
        }"#;
        let result: TriageResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.complexity, Complexity::Simple);
        assert_eq!(result.affected_files.len(), 1);
        assert!(result.confidence > 0.9);
    }

    #[test]
    fn generation_failure_parses() {
        let json = r#"{
            "success": false,
            "changes": [],
            "explanation": "request references a page that does not exist",
            "testSuggestions": [],
            "error": "cannot locate target"
        }"#;
        let result: GenerationResult = serde_json::from_str(json).unwrap();
        assert!(!result.success);
        assert!(result.changes.is_empty());
        assert_eq!(result.error.as_deref(), Some("cannot locate target"));
    }

    #[test]
    fn file_action_uses_snake_case() {
        let edit: FileEdit = serde_json::from_str(
            r#"{"filePath": "src/a.ts", "action": "modify", "newContent": "x", "description": "d"}"#,
        )
        .unwrap();
        assert_eq!(edit.action, FileAction::Modify);
    }

    #[test]
    fn out_of_scope_complexity_round_trips() {
        let json = serde_json::to_string(&Complexity::OutOfScope).unwrap();
        assert_eq!(json, "\"out_of_scope\"");
        let back: Complexity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Complexity::OutOfScope);
    }
}
