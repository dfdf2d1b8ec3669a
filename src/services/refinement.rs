//! Refinement Loop
//!
//! The top-level controller: runs the scenario, and on failure hands the
//! failure context to the fix agent, forks the next run from the last
//! checkpoint, and repeats until the scenario passes or attempts run out.
//! One continuous fix session spans all attempts for a scenario, so the
//! agent keeps memory of what it already tried.

use tracing::{debug, warn};

use crate::models::{
    AttemptOutcome, AttemptRecord, RefineConfig, RefinementReport, RunState, Scenario,
};
use crate::services::checkpoint::{CheckpointStore, ForkPlan};
use crate::services::executor::{ExecutionOutcome, ScenarioRunner};
use crate::services::fix_session::FixAgent;

const BANNER_WIDTH: usize = 70;

/// Drives one scenario through repeated execute-fix cycles
pub struct RefinementLoop {
    config: RefineConfig,
    checkpoints: CheckpointStore,
    runner: Box<dyn ScenarioRunner>,
    fix_agent: Box<dyn FixAgent>,
}

impl RefinementLoop {
    /// Create a controller over the given collaborators
    pub fn new(
        config: RefineConfig,
        checkpoints: CheckpointStore,
        runner: Box<dyn ScenarioRunner>,
        fix_agent: Box<dyn FixAgent>,
    ) -> Self {
        Self {
            config,
            checkpoints,
            runner,
            fix_agent,
        }
    }

    /// Run the refinement loop for a scenario until it passes or attempts
    /// are exhausted. Always reaches a terminal state; infrastructure
    /// failures inside an attempt degrade that attempt, never the run.
    pub async fn run(&self, scenario: &Scenario) -> RefinementReport {
        self.print_header(scenario);

        let mut history: Vec<AttemptRecord> = Vec::new();
        let mut fix_session_id: Option<String> = None;
        let mut last_failing_index: Option<u32> = None;

        for attempt in 1..=self.config.max_attempts {
            debug!("Controller state: {}", RunState::Running(attempt));
            println!("[Attempt {}/{}]", attempt, self.config.max_attempts);
            println!("{}", "-".repeat(40));

            let fork = if attempt > 1 {
                CheckpointStore::fork_point(last_failing_index)
            } else {
                ForkPlan::default()
            };

            match (fork.fork_from, fork.prompt_index) {
                (Some(from), Some(at)) => {
                    println!("Forking from checkpoint {}, running prompt {}", from, at)
                }
                (None, Some(0)) => println!("First prompt failed, running from start"),
                _ => {}
            }

            match self.runner.execute(scenario, &fork).await {
                ExecutionOutcome::Passed => {
                    self.print_banner(&format!(
                        "SUCCESS: All tests passed on attempt {}",
                        attempt
                    ));
                    return RefinementReport {
                        state: RunState::Succeeded,
                        attempts_used: attempt,
                        history,
                    };
                }
                ExecutionOutcome::Failed(None) => {
                    // Nothing actionable: no prompt to blame, nothing to show
                    // the fix agent. Record the attempt and move on.
                    println!("Error: Test failed but no fix context available");
                    history.push(AttemptRecord::degraded(
                        attempt,
                        "no failure context available",
                    ));
                }
                ExecutionOutcome::Failed(Some(failure)) => {
                    last_failing_index = Some(failure.prompt_index);

                    // Steps before the failing one passed; mirror that into
                    // the checkpoint file. Best-effort: a write failure must
                    // not end the run.
                    if failure.prompt_index > 0 {
                        if let Err(e) =
                            self.checkpoints.record(scenario, failure.prompt_index - 1)
                        {
                            warn!("Checkpoint write failed (continuing): {}", e);
                        }
                    }

                    println!(
                        "Failed at prompt {}: {}...",
                        failure.prompt_index,
                        truncate_chars(&failure.prompt_text, 60)
                    );
                    println!("Quality: {}", failure.quality);
                    println!(
                        "Refinement suggestion: {}...",
                        truncate_chars(&failure.refinement_suggestion, 100)
                    );
                    println!();

                    println!("Running fix agent...");
                    if let Some(ref id) = fix_session_id {
                        println!("Continuing fix session: {}...", truncate_chars(id, 20));
                    }

                    let fix = self
                        .fix_agent
                        .apply_fix(
                            &failure,
                            scenario.platform,
                            fix_session_id.as_deref(),
                            &history,
                        )
                        .await;

                    // A new token replaces the old one; otherwise the session
                    // carries forward unchanged.
                    if let Some(id) = fix.session_id {
                        fix_session_id = Some(id);
                    }

                    if fix.files_changed.is_empty() {
                        println!("No files changed (fix may have failed)");
                    } else {
                        println!("Files changed: {:?}", fix.files_changed);
                    }
                    println!("Summary: {}...", truncate_chars(&fix.summary, 200));
                    println!();

                    history.push(AttemptRecord {
                        attempt,
                        files_changed: fix.files_changed,
                        outcome: AttemptOutcome::StillFailing,
                        error_summary: truncate_chars(&failure.refinement_suggestion, 100),
                    });
                }
            }
        }

        self.print_banner(&format!(
            "FAILED: Max attempts ({}) reached without passing all tests",
            self.config.max_attempts
        ));
        RefinementReport {
            state: RunState::FailedExhausted,
            attempts_used: self.config.max_attempts,
            history,
        }
    }

    fn print_header(&self, scenario: &Scenario) {
        println!("{}", "=".repeat(BANNER_WIDTH));
        println!("SKILL REFINEMENT LOOP (with checkpoint-based iteration)");
        println!("{}", "=".repeat(BANNER_WIDTH));
        println!("Scenario: {}", scenario.name);
        println!("Platform: {}", scenario.platform);
        println!("Max attempts: {}", self.config.max_attempts);
        println!(
            "Model: {}, Judge: {}",
            self.config.model, self.config.judge_model
        );
        println!("Mock mode: {}", self.config.mock_mode);
        println!("{}", "=".repeat(BANNER_WIDTH));
        println!();
    }

    fn print_banner(&self, message: &str) {
        println!();
        println!("{}", "=".repeat(BANNER_WIDTH));
        println!("{}", message);
        println!("{}", "=".repeat(BANNER_WIDTH));
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
