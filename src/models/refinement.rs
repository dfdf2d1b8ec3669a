//! Refinement Models
//!
//! Configuration and bookkeeping types for the refinement loop: the run
//! configuration, the controller state machine, per-attempt records, and the
//! final report returned to the caller.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::paths::default_checkpoint_dir;

/// Configuration for one refinement run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Maximum fix attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Model used to run the scenario prompts
    #[serde(default = "default_model")]
    pub model: String,
    /// Model used by the judge inside the test harness
    #[serde(default = "default_judge_model")]
    pub judge_model: String,
    /// Model used by the fix agent
    #[serde(default = "default_model")]
    pub fix_model: String,
    /// Container image running the test harness
    #[serde(default = "default_image")]
    pub image: String,
    /// Project root (hosts the `secrets/` credential directory)
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,
    /// Directory holding checkpoint files, shared with the container
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    /// Wall-clock timeout for one scenario execution, in seconds
    #[serde(default = "default_test_timeout")]
    pub test_timeout_secs: u64,
    /// Wall-clock timeout for one fix-agent invocation, in seconds
    #[serde(default = "default_fix_timeout")]
    pub fix_timeout_secs: u64,
    /// Route platform traffic to the in-container mock persistence layer
    #[serde(default)]
    pub mock_mode: bool,
    /// Verbose diagnostics
    #[serde(default)]
    pub verbose: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_model() -> String {
    "sonnet".to_string()
}

fn default_judge_model() -> String {
    "haiku".to_string()
}

fn default_image() -> String {
    "as-demo-container:latest".to_string()
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_test_timeout() -> u64 {
    600 // 10 minutes
}

fn default_fix_timeout() -> u64 {
    300 // 5 minutes
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            model: default_model(),
            judge_model: default_judge_model(),
            fix_model: default_model(),
            image: default_image(),
            project_root: default_project_root(),
            checkpoint_dir: default_checkpoint_dir(),
            test_timeout_secs: default_test_timeout(),
            fix_timeout_secs: default_fix_timeout(),
            mock_mode: false,
            verbose: false,
        }
    }
}

/// State of the refinement controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// An attempt is in flight
    Running(u32),
    /// The scenario passed in full
    Succeeded,
    /// All attempts were used without a passing run
    FailedExhausted,
}

impl RunState {
    /// Whether this is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Running(_))
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Running(attempt) => write!(f, "running (attempt {})", attempt),
            RunState::Succeeded => write!(f, "succeeded"),
            RunState::FailedExhausted => write!(f, "failed (attempts exhausted)"),
        }
    }
}

/// Outcome label recorded for one refinement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The step failed and a fix was attempted
    StillFailing,
    /// The run failed without producing actionable context; no fix was run
    NoContext,
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptOutcome::StillFailing => write!(f, "still failing"),
            AttemptOutcome::NoContext => write!(f, "no failure context"),
        }
    }
}

/// Record of one refinement iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: u32,
    /// Files the fix agent appears to have touched (advisory)
    pub files_changed: Vec<String>,
    /// Outcome label for this attempt
    pub outcome: AttemptOutcome,
    /// Truncated error summary (usually the refinement suggestion)
    pub error_summary: String,
}

impl AttemptRecord {
    /// Record a degraded attempt where no failure context was available
    pub fn degraded(attempt: u32, error_summary: impl Into<String>) -> Self {
        Self {
            attempt,
            files_changed: Vec::new(),
            outcome: AttemptOutcome::NoContext,
            error_summary: error_summary.into(),
        }
    }
}

/// Final report for a refinement run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementReport {
    /// Terminal controller state
    pub state: RunState,
    /// Number of attempts executed
    pub attempts_used: u32,
    /// Ordered attempt history
    pub history: Vec<AttemptRecord>,
}

impl RefinementReport {
    /// Whether the run ended in success
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }
}
