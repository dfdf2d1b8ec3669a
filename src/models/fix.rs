//! Fix Result Models
//!
//! Outcome of one fix-agent invocation. The changed-file list is best-effort
//! text extraction, not a verified diff; whether a fix actually worked is
//! decided by the next scenario execution.

use serde::{Deserialize, Serialize};

/// Result of a single fix-agent invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixResult {
    /// Whether the agent invocation itself completed successfully
    pub success: bool,
    /// File paths the agent appears to have touched (advisory)
    pub files_changed: Vec<String>,
    /// Human-readable summary of what the agent did
    pub summary: String,
    /// Session token allowing the next invocation to resume this session
    pub session_id: Option<String>,
}

impl FixResult {
    /// Create a failed result with an explanatory summary, keeping the
    /// existing session token so a later attempt can still resume.
    pub fn failure(summary: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            success: false,
            files_changed: Vec::new(),
            summary: summary.into(),
            session_id,
        }
    }
}
