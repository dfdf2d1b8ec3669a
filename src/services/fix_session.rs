//! Fix Session Manager
//!
//! Invokes the code-editing agent (the `claude` CLI) with the failure context
//! from a scenario run, maintaining one continuous editing session across
//! repeated attempts via the `--resume` token. Errors never cross this
//! boundary: a timeout or invocation failure comes back as an unsuccessful
//! [`FixResult`] with an explanatory summary.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::models::{
    AttemptRecord, FailureContext, FixResult, PlatformId, PlatformRegistry, RefineConfig,
};
use crate::utils::json::extract_json;

/// Per-file content cap in the rendered prompt, to respect context limits
const MAX_FILE_CONTENT_CHARS: usize = 3000;

/// Tail length kept from the agent's response as the attempt summary
const MAX_SUMMARY_CHARS: usize = 500;

/// Most recent attempts included in the rendered prompt. The full history
/// stays in memory; only the rendering is bounded.
const MAX_HISTORY_IN_PROMPT: usize = 10;

/// Seam between the refinement controller and the code-editing agent
#[async_trait]
pub trait FixAgent: Send + Sync {
    /// Ask the agent to repair the failure. `session_id` resumes a prior
    /// editing session; `history` lists every earlier attempt in this run.
    async fn apply_fix(
        &self,
        failure: &FailureContext,
        platform: PlatformId,
        session_id: Option<&str>,
        history: &[AttemptRecord],
    ) -> FixResult;
}

/// Production fix agent backed by the `claude` CLI
pub struct ClaudeFixSession {
    config: RefineConfig,
    registry: PlatformRegistry,
}

impl ClaudeFixSession {
    /// Create a fix session manager for the given run configuration
    pub fn new(config: RefineConfig, registry: PlatformRegistry) -> Self {
        Self { config, registry }
    }

    /// Render the natural-language repair request
    fn render_prompt(
        &self,
        failure: &FailureContext,
        platform: PlatformId,
        history: &[AttemptRecord],
    ) -> String {
        let mut prompt = format!(
            "You are a skill refinement agent. A {} Assistant Skill test has failed \
             and you need to fix it.\n\n\
             ## Failure Details\n\n\
             **Prompt that failed:**\n{}\n\n\
             **Tools called:** {}\n\n\
             **Tool Assertions:**\n{}\n\n\
             **Text Assertions:**\n{}\n\n\
             **Quality Rating:** {}\n\
             **Tool Accuracy:** {}\n\n\
             **Judge Reasoning:**\n{}\n\n\
             **Refinement Suggestion:**\n{}\n\n\
             ## Relevant Files\n\n",
            platform.title(),
            failure.prompt_text,
            failure.tools_called.join(", "),
            serde_json::to_string_pretty(&failure.tool_assertions).unwrap_or_default(),
            serde_json::to_string_pretty(&failure.text_assertions).unwrap_or_default(),
            failure.quality,
            failure.tool_accuracy,
            failure.reasoning,
            failure.refinement_suggestion,
        );

        for id in self.registry.required_platforms(platform) {
            let Some(config) = self.registry.get(id) else {
                continue;
            };
            let skills_path = self.registry.skills_path(id);
            prompt.push_str(&format!(
                "**{} skill files:** {}/{}/skills/\n",
                id.title(),
                skills_path.display(),
                config.plugin_name
            ));
            prompt.push_str(&format!(
                "**{} library files:** {}/{}/src/{}/\n",
                id.title(),
                skills_path.display(),
                config.lib_name,
                config.lib_package
            ));
        }

        prompt.push_str("\nCurrent relevant file contents:\n");
        for (path, content) in &failure.relevant_files {
            let capped: String = content.chars().take(MAX_FILE_CONTENT_CHARS).collect();
            prompt.push_str(&format!("\n### {}\n```\n{}\n```\n", path, capped));
        }

        if !failure.git_history.is_empty() {
            prompt.push_str("\n## Recent Git History\n");
            for commit in &failure.git_history {
                prompt.push_str(&format!("- {}: {}\n", commit.commit, commit.message));
            }
        }

        if !history.is_empty() {
            prompt.push_str("\n## Previous Fix Attempts (this session)\n");
            let start = history.len().saturating_sub(MAX_HISTORY_IN_PROMPT);
            for record in &history[start..] {
                prompt.push_str(&format!("- Attempt {}: ", record.attempt));
                if !record.files_changed.is_empty() {
                    prompt.push_str(&format!("Changed {:?}, ", record.files_changed));
                }
                prompt.push_str(&format!("Result: {}\n", record.outcome));
                if !record.error_summary.is_empty() {
                    prompt.push_str(&format!("  Error: {}\n", record.error_summary));
                }
            }
        }

        prompt.push_str(
            "\n\n## Your Task\n\n\
             Analyze the failure and make targeted changes to fix it. Focus on:\n\n\
             1. **If tool selection is wrong**: Update the skill description to better \
             trigger on this type of query\n\
             2. **If tool worked but output is wrong**: Check if the skill examples or \
             instructions need improvement\n\
             3. **If there's an API error**: Check the library code for bugs\n\n\
             Make minimal, focused changes. Edit the actual files - do not just describe \
             what to change.\n\n\
             After making changes, provide a brief summary of what you changed and why.\n",
        );

        prompt
    }

    /// Extract the session ID from the agent's JSON envelope, falling back
    /// to the previous token when the output is unparseable.
    fn session_id_from_output(output: &str, fallback: Option<&str>) -> Option<String> {
        extract_json(output)
            .and_then(|v| {
                v.get("session_id")
                    .and_then(|s| s.as_str())
                    .map(String::from)
            })
            .or_else(|| fallback.map(String::from))
    }

    /// Extract displayable text from the agent's output.
    ///
    /// The envelope carries either a `result` string or a `content` list of
    /// typed blocks; unparseable output passes through as-is.
    fn text_from_output(output: &str) -> String {
        if let Some(value) = extract_json(output) {
            if let Some(result) = value.get("result").and_then(|r| r.as_str()) {
                return result.to_string();
            }
            if let Some(blocks) = value.get("content").and_then(|c| c.as_array()) {
                return blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n");
            }
        }
        output.to_string()
    }

    /// Best-effort extraction of changed file paths from the agent's
    /// free-text response. Advisory only; the next scenario run is the
    /// ground truth for whether the fix worked.
    fn extract_files_changed(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        if !text.contains("Edit") && !lowered.contains("edited") && !lowered.contains("updated") {
            return Vec::new();
        }

        let Ok(pattern) = Regex::new(r#"(?:skills/|lib/|src/)[^\s'"`]+\.(?:md|py)"#) else {
            return Vec::new();
        };

        let mut files: Vec<String> = pattern
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        files.sort();
        files.dedup();
        files
    }

    /// Keep the tail of the agent's response as the summary
    fn summarize(text: &str) -> String {
        let count = text.chars().count();
        if count <= MAX_SUMMARY_CHARS {
            return text.to_string();
        }
        text.chars().skip(count - MAX_SUMMARY_CHARS).collect()
    }
}

#[async_trait]
impl FixAgent for ClaudeFixSession {
    async fn apply_fix(
        &self,
        failure: &FailureContext,
        platform: PlatformId,
        session_id: Option<&str>,
        history: &[AttemptRecord],
    ) -> FixResult {
        let prompt = self.render_prompt(failure, platform, history);

        // The agent edits files relative to the primary platform's skills
        // repository, matching the paths referenced in the prompt.
        let primary = self.registry.primary_platform(platform);
        let working_dir = self.registry.skills_path(primary);

        debug!(
            "Running fix agent for prompt index {} (resume: {})",
            failure.prompt_index,
            session_id.unwrap_or("fresh session")
        );

        let mut cmd = Command::new("claude");
        cmd.arg("-p")
            .arg(&prompt)
            .arg("--model")
            .arg(&self.config.fix_model)
            .arg("--dangerously-skip-permissions")
            .arg("--output-format")
            .arg("json")
            .current_dir(&working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(id) = session_id {
            cmd.arg("--resume").arg(id);
        }

        let wall_clock = Duration::from_secs(self.config.fix_timeout_secs);
        match timeout(wall_clock, cmd.output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let new_session = Self::session_id_from_output(&stdout, session_id);
                let text = Self::text_from_output(&stdout);

                FixResult {
                    success: output.status.success(),
                    files_changed: Self::extract_files_changed(&text),
                    summary: Self::summarize(&text),
                    session_id: new_session,
                }
            }
            Ok(Err(e)) => {
                let summary = if e.kind() == std::io::ErrorKind::NotFound {
                    "Claude Code CLI not found. Please install it with: \
                     npm install -g @anthropic-ai/claude-code"
                        .to_string()
                } else {
                    format!("Fix agent error: {}", e)
                };
                warn!("{}", summary);
                FixResult::failure(summary, session_id.map(String::from))
            }
            Err(_) => {
                warn!(
                    "Fix agent timed out after {} seconds",
                    self.config.fix_timeout_secs
                );
                FixResult::failure(
                    format!(
                        "Fix agent timed out after {} seconds",
                        self.config.fix_timeout_secs
                    ),
                    session_id.map(String::from),
                )
            }
        }
    }
}
