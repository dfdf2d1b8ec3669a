//! Checkpoint Store
//!
//! Durable record of the furthest passed step for a `(platform, scenario)`
//! pair, shared with the test container through a bind-mounted directory.
//! Checkpoints are best-effort caching: a write failure must never abort a
//! refinement run, because the run can always restart from the beginning.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::Scenario;
use crate::utils::error::AppResult;
use crate::utils::paths::ensure_dir;

/// Persisted last-passed-step marker for one `(platform, scenario)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Platform identifier, as rendered in the file name
    pub platform: String,
    /// Scenario name
    pub scenario: String,
    /// Index of the last step that passed
    pub last_passed_step: u32,
    /// Last write timestamp (RFC 3339)
    pub updated_at: String,
}

/// Where a resumed execution should start.
///
/// `fork_from` is the checkpoint index to restore conversational state from;
/// `prompt_index` is the step the run resumes at. Both `None` means a fresh
/// run from step 0 with no restored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForkPlan {
    /// Checkpoint index to fork conversational state from
    pub fork_from: Option<u32>,
    /// Step index to resume execution at
    pub prompt_index: Option<u32>,
}

impl ForkPlan {
    /// Whether this plan runs the scenario from the very beginning
    pub fn is_fresh(&self) -> bool {
        self.fork_from.is_none() && self.prompt_index.is_none()
    }
}

/// File-backed store with one checkpoint file per `(platform, scenario)` pair
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory is created lazily on the first write, so construction
    /// never fails.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the checkpoint file for a scenario
    pub fn checkpoint_path(&self, scenario: &Scenario) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", scenario.platform, scenario.name))
    }

    /// Persist the furthest passed step for a scenario, overwriting any
    /// previous checkpoint for the same pair.
    pub fn record(&self, scenario: &Scenario, step_index: u32) -> AppResult<()> {
        ensure_dir(&self.dir)?;

        let checkpoint = Checkpoint {
            platform: scenario.platform.to_string(),
            scenario: scenario.name.clone(),
            last_passed_step: step_index,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        let content = serde_json::to_string_pretty(&checkpoint)?;
        fs::write(self.checkpoint_path(scenario), content)?;
        Ok(())
    }

    /// Load the checkpoint for a scenario, if one exists.
    ///
    /// A missing or unreadable file degrades to `None`; stale or corrupt
    /// checkpoints are not worth failing a run over.
    pub fn load(&self, scenario: &Scenario) -> Option<Checkpoint> {
        let path = self.checkpoint_path(scenario);
        if !path.exists() {
            return None;
        }

        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                warn!("Ignoring corrupt checkpoint {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Compute where the next execution should start, given the step index
    /// that failed last.
    ///
    /// `None` (first attempt, or index unknown) runs from the beginning.
    /// Index 0 also runs from the beginning: there is no prior step to fork
    /// from. Index `k > 0` forks from checkpoint `k - 1` and resumes at `k`.
    pub fn fork_point(last_failing_index: Option<u32>) -> ForkPlan {
        match last_failing_index {
            None => ForkPlan::default(),
            Some(0) => ForkPlan {
                fork_from: None,
                prompt_index: Some(0),
            },
            Some(k) => ForkPlan {
                fork_from: Some(k - 1),
                prompt_index: Some(k),
            },
        }
    }
}
