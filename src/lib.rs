//! skill-refine - Iterative Test-and-Fix Refinement for Assistant Skills
//!
//! Runs a scripted, multi-step conversational test scenario against an
//! Assistant Skills implementation inside an isolated container. When a step
//! fails, a code-editing agent is invoked with the structured failure
//! context to patch the implementation, and the test resumes from the point
//! of failure instead of from scratch. The loop repeats until the scenario
//! passes or the attempt budget is exhausted.

pub mod models;
pub mod services;
pub mod utils;

pub use models::{
    AttemptOutcome, AttemptRecord, FailureContext, FixResult, PlatformId, PlatformRegistry,
    RefineConfig, RefinementReport, RunState, Scenario,
};
pub use services::{
    CheckpointStore, ClaudeFixSession, DockerScenarioExecutor, ExecutionOutcome, FixAgent,
    ForkPlan, RefinementLoop, ScenarioRunner,
};
pub use utils::error::{AppError, AppResult};
pub use utils::json::extract_json;
