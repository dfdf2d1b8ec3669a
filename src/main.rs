//! skill-refine CLI entry point.
//!
//! Validates the platform setup, builds the immutable run configuration,
//! and drives the refinement loop. Exit status reflects overall success.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use skill_refine::models::{PlatformId, PlatformRegistry, RefineConfig, Scenario};
use skill_refine::services::{
    CheckpointStore, ClaudeFixSession, DockerScenarioExecutor, RefinementLoop,
};
use skill_refine::utils::error::{AppError, AppResult};

#[derive(Parser, Debug)]
#[command(
    name = "skill-refine",
    about = "Iteratively test and fix Assistant Skills",
    version
)]
struct Args {
    /// Scenario name (e.g. page, issue, sre)
    #[arg(long)]
    scenario: String,

    /// Platform to test
    #[arg(long, value_enum)]
    platform: PlatformId,

    /// Maximum fix attempts before giving up
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Model for running prompts
    #[arg(long, default_value = "sonnet")]
    model: String,

    /// Model for the LLM judge
    #[arg(long, default_value = "haiku")]
    judge_model: String,

    /// Model for the fix agent
    #[arg(long, default_value = "sonnet")]
    fix_model: String,

    /// Container image running the test harness
    #[arg(long, default_value = "as-demo-container:latest")]
    image: String,

    /// Directory for checkpoint files (bind-mounted into the container)
    #[arg(long, default_value = "/tmp/checkpoints")]
    checkpoint_dir: PathBuf,

    /// Project root hosting the secrets/ directory
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Enable mock mode for testing without live platform credentials
    #[arg(long)]
    mock: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "skill_refine=debug"
    } else {
        "skill_refine=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Diagnostics go to stderr; stdout is reserved for loop progress
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Fail fast on anything the loop cannot recover from: every required
/// platform needs a resolvable plugin directory. Missing credentials only
/// warn, because mock mode runs without them.
fn validate_setup(registry: &PlatformRegistry, platform: PlatformId) -> AppResult<()> {
    for id in registry.required_platforms(platform) {
        let skills_path = registry.skills_path(id);

        if registry.plugin_path(id).is_none() {
            let plugin_name = registry
                .get(id)
                .map(|c| c.plugin_name.clone())
                .unwrap_or_default();
            return Err(AppError::validation(format!(
                "{} plugin not found at {} (expected {}/plugins/{} or {}/{})",
                id.title(),
                skills_path.display(),
                skills_path.display(),
                plugin_name,
                skills_path.display(),
                plugin_name
            )));
        }

        if let Some(config) = registry.get(id) {
            if let Some(primary) = config.env_vars.first() {
                if std::env::var(primary).unwrap_or_default().is_empty() {
                    eprintln!("Warning: {} not set for {}", primary, id);
                }
            }
        }
    }

    Ok(())
}

async fn run(args: Args) -> Result<bool> {
    let project_root = args.project_root.canonicalize().map_err(|e| {
        AppError::config(format!(
            "Invalid project root {}: {}",
            args.project_root.display(),
            e
        ))
    })?;

    let registry = PlatformRegistry::from_env(&project_root);
    validate_setup(&registry, args.platform)?;

    for id in registry.required_platforms(args.platform) {
        println!("  {} skills: {}", id.title(), registry.skills_path(id).display());
    }

    let config = RefineConfig {
        max_attempts: args.max_attempts,
        model: args.model,
        judge_model: args.judge_model,
        fix_model: args.fix_model,
        image: args.image,
        project_root,
        checkpoint_dir: args.checkpoint_dir,
        mock_mode: args.mock,
        verbose: args.verbose,
        ..Default::default()
    };

    let scenario = Scenario::new(args.platform, &args.scenario);
    let checkpoints = CheckpointStore::new(&config.checkpoint_dir);
    let executor = DockerScenarioExecutor::new(config.clone(), registry.clone());
    let fix_session = ClaudeFixSession::new(config.clone(), registry);

    let refinement = RefinementLoop::new(
        config,
        checkpoints,
        Box::new(executor),
        Box::new(fix_session),
    );

    let report = refinement.run(&scenario).await;
    Ok(report.succeeded())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
