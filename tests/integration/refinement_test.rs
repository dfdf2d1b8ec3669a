//! Refinement Loop Integration Tests
//!
//! Drives the full controller against scripted executor/fix-agent
//! implementations and a real checkpoint store in a temporary directory:
//! - checkpoint-based fork sequencing across attempts
//! - termination on success and on attempt exhaustion
//! - fix-session continuation token threading
//! - degraded attempts (failure without context)
//!
//! No containers are started and no LLM calls are made.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use skill_refine::models::{
    AttemptOutcome, AttemptRecord, FailureContext, FixResult, PlatformId, RefineConfig, RunState,
    Scenario,
};
use skill_refine::services::{
    CheckpointStore, ExecutionOutcome, FixAgent, ForkPlan, RefinementLoop, ScenarioRunner,
};

// ============================================================================
// Scripted collaborators
// ============================================================================

struct ScriptedRunner {
    script: Mutex<VecDeque<ExecutionOutcome>>,
    calls: Arc<Mutex<Vec<ForkPlan>>>,
}

impl ScriptedRunner {
    fn new(script: Vec<ExecutionOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> Arc<Mutex<Vec<ForkPlan>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ScenarioRunner for ScriptedRunner {
    async fn execute(&self, _scenario: &Scenario, fork: &ForkPlan) -> ExecutionOutcome {
        self.calls.lock().unwrap().push(*fork);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ExecutionOutcome::Failed(None))
    }
}

#[derive(Clone)]
struct RecordedFixCall {
    session_id: Option<String>,
    history: Vec<AttemptRecord>,
}

struct ScriptedFixAgent {
    results: Mutex<VecDeque<FixResult>>,
    calls: Arc<Mutex<Vec<RecordedFixCall>>>,
}

impl ScriptedFixAgent {
    fn new(results: Vec<FixResult>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> Arc<Mutex<Vec<RecordedFixCall>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl FixAgent for ScriptedFixAgent {
    async fn apply_fix(
        &self,
        _failure: &FailureContext,
        _platform: PlatformId,
        session_id: Option<&str>,
        history: &[AttemptRecord],
    ) -> FixResult {
        self.calls.lock().unwrap().push(RecordedFixCall {
            session_id: session_id.map(String::from),
            history: history.to_vec(),
        });
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| FixResult::failure("scripted results exhausted", None))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn failure_at(index: u32) -> ExecutionOutcome {
    ExecutionOutcome::Failed(Some(FailureContext {
        prompt_index: index,
        prompt_text: format!("prompt {}", index),
        refinement_suggestion: format!("suggestion for step {}", index),
        ..Default::default()
    }))
}

fn fix_ok(session: Option<&str>, files: &[&str]) -> FixResult {
    FixResult {
        success: true,
        files_changed: files.iter().map(|f| f.to_string()).collect(),
        summary: "made an edit".to_string(),
        session_id: session.map(String::from),
    }
}

fn scenario() -> Scenario {
    Scenario::new(PlatformId::Confluence, "page")
}

fn build_loop(
    max_attempts: u32,
    store: CheckpointStore,
    runner: ScriptedRunner,
    agent: ScriptedFixAgent,
) -> RefinementLoop {
    let config = RefineConfig {
        max_attempts,
        ..Default::default()
    };
    RefinementLoop::new(config, store, Box::new(runner), Box::new(agent))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn three_step_scenario_forks_forward_through_checkpoints() {
    let temp = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(temp.path());

    // Attempt 1 fails at step 2, attempt 2 fails at step 3, attempt 3 passes
    let runner = ScriptedRunner::new(vec![
        failure_at(2),
        failure_at(3),
        ExecutionOutcome::Passed,
    ]);
    let runner_calls = runner.calls();
    let agent = ScriptedFixAgent::new(vec![
        fix_ok(Some("sess-1"), &["skills/page/SKILL.md"]),
        fix_ok(None, &[]),
    ]);

    let refinement = build_loop(3, store.clone(), runner, agent);
    let report = refinement.run(&scenario()).await;

    assert_eq!(report.state, RunState::Succeeded);
    assert_eq!(report.attempts_used, 3);

    let calls = runner_calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].is_fresh());
    assert_eq!(calls[1].fork_from, Some(1));
    assert_eq!(calls[1].prompt_index, Some(2));
    assert_eq!(calls[2].fork_from, Some(2));
    assert_eq!(calls[2].prompt_index, Some(3));

    // The checkpoint file tracked the furthest passed step
    let checkpoint = store.load(&scenario()).unwrap();
    assert_eq!(checkpoint.last_passed_step, 2);
}

#[tokio::test]
async fn step_zero_failure_restarts_without_fork() {
    let temp = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new(vec![failure_at(0), failure_at(0)]);
    let runner_calls = runner.calls();
    let agent = ScriptedFixAgent::new(vec![fix_ok(None, &[]), fix_ok(None, &[])]);

    let refinement = build_loop(2, CheckpointStore::new(temp.path()), runner, agent);
    let report = refinement.run(&scenario()).await;

    assert_eq!(report.state, RunState::FailedExhausted);

    let calls = runner_calls.lock().unwrap();
    assert!(calls[0].is_fresh());
    // Resume from step 0 with no fork offset applied
    assert_eq!(calls[1].fork_from, None);
    assert_eq!(calls[1].prompt_index, Some(0));

    // Step 0 failing leaves no checkpoint behind
    let store = CheckpointStore::new(temp.path());
    assert!(store.load(&scenario()).is_none());
}

#[tokio::test]
async fn loop_terminates_in_exactly_max_attempts() {
    let temp = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new(vec![
        failure_at(1),
        failure_at(1),
        failure_at(1),
        failure_at(1),
        failure_at(1),
    ]);
    let runner_calls = runner.calls();
    let agent = ScriptedFixAgent::new(
        (0..5).map(|_| fix_ok(None, &[])).collect(),
    );

    let refinement = build_loop(4, CheckpointStore::new(temp.path()), runner, agent);
    let report = refinement.run(&scenario()).await;

    assert_eq!(report.state, RunState::FailedExhausted);
    assert_eq!(report.attempts_used, 4);
    assert_eq!(runner_calls.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn continuation_token_passes_unchanged_until_replaced() {
    let temp = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new(vec![
        failure_at(1),
        failure_at(1),
        failure_at(1),
        failure_at(1),
    ]);
    let agent = ScriptedFixAgent::new(vec![
        fix_ok(Some("sess-a"), &[]),
        fix_ok(None, &[]),
        fix_ok(Some("sess-b"), &[]),
        fix_ok(None, &[]),
    ]);
    let agent_calls = agent.calls();

    let refinement = build_loop(4, CheckpointStore::new(temp.path()), runner, agent);
    refinement.run(&scenario()).await;

    let sessions: Vec<Option<String>> = agent_calls
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.session_id.clone())
        .collect();
    assert_eq!(
        sessions,
        vec![
            None,
            Some("sess-a".to_string()),
            Some("sess-a".to_string()),
            Some("sess-b".to_string()),
        ]
    );
}

#[tokio::test]
async fn fix_agent_sees_full_ordered_history() {
    let temp = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new(vec![
        ExecutionOutcome::Failed(None),
        failure_at(1),
        failure_at(2),
    ]);
    let agent = ScriptedFixAgent::new(vec![
        fix_ok(None, &["lib/a.py"]),
        fix_ok(None, &[]),
    ]);
    let agent_calls = agent.calls();

    let refinement = build_loop(3, CheckpointStore::new(temp.path()), runner, agent);
    let report = refinement.run(&scenario()).await;

    assert_eq!(report.state, RunState::FailedExhausted);

    let calls = agent_calls.lock().unwrap();
    // Attempt 1 was degraded, so the agent first ran on attempt 2 and saw
    // the degraded attempt in its history
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].history.len(), 1);
    assert_eq!(calls[0].history[0].outcome, AttemptOutcome::NoContext);

    // The second invocation saw both prior attempts, in order
    assert_eq!(calls[1].history.len(), 2);
    assert_eq!(calls[1].history[0].attempt, 1);
    assert_eq!(calls[1].history[1].attempt, 2);
    assert_eq!(calls[1].history[1].outcome, AttemptOutcome::StillFailing);
    assert_eq!(calls[1].history[1].files_changed, vec!["lib/a.py"]);
}

#[tokio::test]
async fn unwritable_checkpoint_dir_still_reaches_terminal_state() {
    let temp = tempfile::tempdir().unwrap();
    let blocked = temp.path().join("blocked");
    std::fs::write(&blocked, "a file where the directory should be").unwrap();

    let runner = ScriptedRunner::new(vec![failure_at(3), failure_at(3)]);
    let agent = ScriptedFixAgent::new(vec![fix_ok(None, &[]), fix_ok(None, &[])]);

    let refinement = build_loop(2, CheckpointStore::new(&blocked), runner, agent);
    let report = refinement.run(&scenario()).await;

    assert_eq!(report.state, RunState::FailedExhausted);
    assert_eq!(report.history.len(), 2);
}

#[tokio::test]
async fn success_on_first_attempt_runs_nothing_else() {
    let temp = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new(vec![ExecutionOutcome::Passed]);
    let runner_calls = runner.calls();
    let agent = ScriptedFixAgent::new(vec![]);
    let agent_calls = agent.calls();

    let refinement = build_loop(3, CheckpointStore::new(temp.path()), runner, agent);
    let report = refinement.run(&scenario()).await;

    assert_eq!(report.state, RunState::Succeeded);
    assert_eq!(report.attempts_used, 1);
    assert_eq!(runner_calls.lock().unwrap().len(), 1);
    assert!(agent_calls.lock().unwrap().is_empty());
}
