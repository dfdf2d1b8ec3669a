//! Services
//!
//! Business logic services for the refinement loop. Services hold the core
//! functionality and are wired together by the binary entry point.

pub mod checkpoint;
pub mod docker;
pub mod executor;
pub mod fix_session;
pub mod refinement;

pub use checkpoint::{Checkpoint, CheckpointStore, ForkPlan};
pub use docker::DockerCommandBuilder;
pub use executor::{DockerScenarioExecutor, ExecutionOutcome, ScenarioRunner};
pub use fix_session::{ClaudeFixSession, FixAgent};
pub use refinement::RefinementLoop;
