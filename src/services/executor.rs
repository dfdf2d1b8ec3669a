//! Scenario Executor
//!
//! Runs a scenario inside the test container, resuming from a fork plan when
//! one is given, and reduces whatever happens — pass, judged failure,
//! timeout, spawn error, unparseable output — to an [`ExecutionOutcome`].
//! Infrastructure failures never surface as errors: anything the controller
//! cannot act on becomes a failure without context.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::models::{FailureContext, PlatformRegistry, RefineConfig, Scenario};
use crate::services::checkpoint::ForkPlan;
use crate::services::docker::DockerCommandBuilder;
use crate::utils::json::extract_json;
use crate::utils::paths::ensure_dir;

/// Outcome of one scenario execution
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// Every step passed
    Passed,
    /// A step failed. Context is present when the harness produced a
    /// parseable failure record, absent on timeout/infrastructure failure.
    Failed(Option<FailureContext>),
}

impl ExecutionOutcome {
    /// Whether the scenario passed in full
    pub fn passed(&self) -> bool {
        matches!(self, ExecutionOutcome::Passed)
    }
}

/// Seam between the refinement controller and scenario execution.
///
/// The production implementation shells out to docker; tests drive the
/// controller with scripted implementations.
#[async_trait]
pub trait ScenarioRunner: Send + Sync {
    /// Execute the scenario, starting at the fork plan's resume point
    async fn execute(&self, scenario: &Scenario, fork: &ForkPlan) -> ExecutionOutcome;
}

/// Production executor running scenarios in the isolated container
pub struct DockerScenarioExecutor {
    config: RefineConfig,
    registry: PlatformRegistry,
}

impl DockerScenarioExecutor {
    /// Create an executor for the given run configuration
    pub fn new(config: RefineConfig, registry: PlatformRegistry) -> Self {
        Self { config, registry }
    }

    fn builder(&self, scenario: &Scenario) -> DockerCommandBuilder {
        DockerCommandBuilder::new(scenario.platform, self.registry.clone())
            .with_image(&self.config.image)
            .with_project_root(&self.config.project_root)
            .with_checkpoint_dir(&self.config.checkpoint_dir)
            .with_mock_mode(self.config.mock_mode)
    }

    /// The in-container harness invocation for a scenario and fork plan
    fn harness_command(
        &self,
        scenario: &Scenario,
        fork: &ForkPlan,
        builder: &DockerCommandBuilder,
    ) -> String {
        let mut cmd = format!(
            "python /workspace/skill-test.py {} --model {} --judge-model {}",
            builder.scenario_container_path(&scenario.name),
            self.config.model,
            self.config.judge_model
        );

        // Conversation mode keeps prior turns in context; fail-fast stops at
        // the first failing prompt so the checkpoint stays meaningful.
        cmd.push_str(" --conversation --fail-fast");
        cmd.push_str(&format!(
            " --checkpoint-file {}",
            builder.checkpoint_container_path(&scenario.name)
        ));

        if let Some(fork_from) = fork.fork_from {
            cmd.push_str(&format!(" --fork-from {}", fork_from));
        }
        if let Some(prompt_index) = fork.prompt_index {
            cmd.push_str(&format!(" --prompt-index {}", prompt_index));
        }

        let skills_paths = self
            .registry
            .required_platforms(scenario.platform)
            .iter()
            .map(|id| self.registry.skills_path(*id).display().to_string())
            .collect::<Vec<_>>()
            .join(",");
        cmd.push_str(&format!(" --fix-context {}", skills_paths));

        if self.config.verbose {
            cmd.push_str(" --verbose");
        }
        if self.config.mock_mode {
            cmd.push_str(" --mock");
        }

        cmd
    }

    /// Reduce raw harness stdout to an execution outcome
    fn outcome_from_stdout(raw: &str) -> ExecutionOutcome {
        let Some(result) = extract_json(raw) else {
            warn!("Could not parse a result object from harness output");
            return ExecutionOutcome::Failed(None);
        };

        if result.get("status").and_then(|s| s.as_str()) == Some("all_passed") {
            return ExecutionOutcome::Passed;
        }

        match FailureContext::from_result_object(&result) {
            Some(ctx) => ExecutionOutcome::Failed(Some(ctx)),
            None => {
                warn!("Harness result carried neither a pass status nor a failure record");
                ExecutionOutcome::Failed(None)
            }
        }
    }
}

#[async_trait]
impl ScenarioRunner for DockerScenarioExecutor {
    async fn execute(&self, scenario: &Scenario, fork: &ForkPlan) -> ExecutionOutcome {
        // The checkpoint mount must exist before docker creates it as root
        if let Err(e) = ensure_dir(&self.config.checkpoint_dir) {
            warn!(
                "Could not create checkpoint directory {}: {}",
                self.config.checkpoint_dir.display(),
                e
            );
        }

        let builder = self.builder(scenario);
        let harness = self.harness_command(scenario, fork, &builder);
        let args = builder.build_run_command(&harness);

        debug!("Running scenario {} (fork: {:?})", scenario, fork);

        let mut cmd = Command::new("docker");
        cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let wall_clock = Duration::from_secs(self.config.test_timeout_secs);
        match timeout(wall_clock, cmd.output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                Self::outcome_from_stdout(&stdout)
            }
            Ok(Err(e)) => {
                warn!("Failed to run test container: {}", e);
                ExecutionOutcome::Failed(None)
            }
            Err(_) => {
                warn!(
                    "Scenario execution timed out after {} seconds",
                    self.config.test_timeout_secs
                );
                ExecutionOutcome::Failed(None)
            }
        }
    }
}
