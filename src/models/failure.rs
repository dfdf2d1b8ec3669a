//! Failure Context Models
//!
//! Structured description of why a scenario step failed, produced by the
//! in-container test harness and consumed by the fix session. Deserialization
//! is tolerant: every field defaults, because the harness output may be
//! partial and a missing detail should degrade the repair prompt, not the
//! parse.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One commit from the recent change history of the skills repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitCommit {
    /// Abbreviated commit hash
    #[serde(default)]
    pub commit: String,
    /// Commit subject line
    #[serde(default)]
    pub message: String,
}

/// Context describing a single failing scenario step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureContext {
    /// Zero-based index of the failing prompt within the scenario
    #[serde(default)]
    pub prompt_index: u32,
    /// The prompt text that failed
    #[serde(default)]
    pub prompt_text: String,
    /// Tool names observed during the failing turn
    #[serde(default)]
    pub tools_called: Vec<String>,
    /// Tool-level assertion results as reported by the judge
    #[serde(default)]
    pub tool_assertions: Value,
    /// Text-level assertion results as reported by the judge
    #[serde(default)]
    pub text_assertions: Value,
    /// Judge quality rating (e.g. "poor", "good")
    #[serde(default)]
    pub quality: String,
    /// Judge tool-accuracy rating
    #[serde(default)]
    pub tool_accuracy: String,
    /// Judge reasoning for the failure verdict
    #[serde(default)]
    pub reasoning: String,
    /// Free-text suggestion for what to change
    #[serde(default)]
    pub refinement_suggestion: String,
    /// Relevant source files (path -> contents, possibly truncated).
    /// BTreeMap keeps rendering order stable across runs.
    #[serde(default)]
    pub relevant_files: BTreeMap<String, String>,
    /// Recent commits touching the skills repository, if available
    #[serde(default)]
    pub git_history: Vec<GitCommit>,
}

impl FailureContext {
    /// Parse a failure context out of the harness result object.
    ///
    /// Expects the `{"failure": {...}}` envelope; returns `None` when the
    /// envelope or its payload does not deserialize.
    pub fn from_result_object(value: &Value) -> Option<Self> {
        let failure = value.get("failure")?;
        serde_json::from_value(failure.clone()).ok()
    }
}
