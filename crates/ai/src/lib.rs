//! AI capability: triage and code generation over the Anthropic Messages
//! API.
//!
//! Triage uses a fast model to classify a change request; generation uses
//! a stronger model to produce a structured set of file edits. Both
//! instruct the model to answer in JSON and extract the payload from the
//! completion text.

mod client;
mod extract;
mod types;

pub use client::{AiClient, AiError};
pub use types::{Complexity, FileAction, FileEdit, GenerationResult, SourceFile, TriageResult};
