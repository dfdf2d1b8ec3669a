//! Docker Command Builder
//!
//! Centralized construction of the `docker run` invocation that isolates a
//! scenario execution: credential and mock-mode environment forwarding,
//! plugin/library volume mounts, the shared checkpoint mount, and the bash
//! entrypoint wrapper that prepares the container before the test harness
//! starts.

use std::path::PathBuf;

use crate::models::{PlatformId, PlatformRegistry};
use crate::utils::paths::{secrets_dir, DEFAULT_CHECKPOINT_DIR};

/// Container-side path of the scenarios directory
const CONTAINER_SCENARIOS_DIR: &str = "/workspace/scenarios";

/// Container-side home of the claude configuration
const CONTAINER_CLAUDE_DIR: &str = "/home/devuser/.claude";

/// Builder for `docker run` commands with platform-specific configuration
#[derive(Debug, Clone)]
pub struct DockerCommandBuilder {
    platform: PlatformId,
    registry: PlatformRegistry,
    image: String,
    project_root: PathBuf,
    checkpoint_dir: PathBuf,
    mock_mode: bool,
}

impl DockerCommandBuilder {
    /// Create a builder for a platform with default options
    pub fn new(platform: PlatformId, registry: PlatformRegistry) -> Self {
        Self {
            platform,
            registry,
            image: "as-demo-container:latest".to_string(),
            project_root: PathBuf::from("."),
            checkpoint_dir: PathBuf::from(DEFAULT_CHECKPOINT_DIR),
            mock_mode: false,
        }
    }

    /// Set the container image
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Set the project root hosting the `secrets/` directory
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// Set the host-side checkpoint directory
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = dir.into();
        self
    }

    /// Enable mock mode for all required platforms
    pub fn with_mock_mode(mut self, mock: bool) -> Self {
        self.mock_mode = mock;
        self
    }

    /// Environment variable arguments for the container.
    ///
    /// Credentials are forwarded from the host environment; unset variables
    /// are passed through empty so the harness can report them itself.
    pub fn env_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        for id in self.registry.required_platforms(self.platform) {
            let Some(config) = self.registry.get(id) else {
                continue;
            };

            for var in &config.env_vars {
                let value = std::env::var(var).unwrap_or_default();
                args.push("-e".to_string());
                args.push(format!("{}={}", var, value));
            }

            if self.mock_mode {
                args.push("-e".to_string());
                args.push(format!("{}=true", config.mock_env_var));
            }
        }

        args.push("-e".to_string());
        args.push(format!("SKILL_TEST_PLATFORM={}", self.platform));

        args
    }

    /// Volume mount arguments: credentials, plugins, libraries, checkpoints
    pub fn volume_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        let secrets = secrets_dir(&self.project_root);
        for file in [".credentials.json", ".claude.json"] {
            let host = secrets.join(file);
            if host.exists() {
                args.push("-v".to_string());
                args.push(format!(
                    "{}:{}/{}:ro",
                    host.display(),
                    CONTAINER_CLAUDE_DIR,
                    file
                ));
            }
        }

        for id in self.registry.required_platforms(self.platform) {
            let Some(config) = self.registry.get(id) else {
                continue;
            };

            if let Some(plugin_path) = self.registry.plugin_path(id) {
                args.push("-v".to_string());
                args.push(format!(
                    "{}:{}/plugins/cache/{}/{}/dev:ro",
                    plugin_path.display(),
                    CONTAINER_CLAUDE_DIR,
                    config.plugin_name,
                    config.plugin_name
                ));
            }

            if let Some(lib_path) = self.registry.lib_path(id) {
                args.push("-v".to_string());
                args.push(format!("{}:/opt/{}:ro", lib_path.display(), config.lib_name));
            }
        }

        args.push("-v".to_string());
        args.push(format!(
            "{}:{}",
            self.checkpoint_dir.display(),
            DEFAULT_CHECKPOINT_DIR
        ));

        args
    }

    /// Shell command installing each required platform library in the container
    pub fn lib_install_command(&self) -> String {
        self.registry
            .required_platforms(self.platform)
            .iter()
            .filter_map(|id| self.registry.get(*id))
            .map(|config| format!("pip install -q -e /opt/{} 2>/dev/null", config.lib_name))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Shell command rewiring each plugin's `latest` symlink to the mounted
    /// `dev` directory, replacing any versioned symlink from the image.
    pub fn symlink_command(&self) -> String {
        self.registry
            .required_platforms(self.platform)
            .iter()
            .filter_map(|id| self.registry.get(*id))
            .map(|config| {
                let cache = format!(
                    "{}/plugins/cache/{}/{}",
                    CONTAINER_CLAUDE_DIR, config.plugin_name, config.plugin_name
                );
                format!(
                    "rm -f {}/*[0-9]* 2>/dev/null; ln -sf dev {}/latest 2>/dev/null",
                    cache, cache
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Container path of a scenario's `.prompts` file
    pub fn scenario_container_path(&self, scenario_name: &str) -> String {
        if self.platform.is_cross_platform() {
            return format!(
                "{}/cross-platform/{}.prompts",
                CONTAINER_SCENARIOS_DIR, scenario_name
            );
        }

        let subdir = self
            .registry
            .get(self.platform)
            .map(|c| c.scenarios_subdir.as_str())
            .unwrap_or_default();
        format!(
            "{}/{}/{}.prompts",
            CONTAINER_SCENARIOS_DIR, subdir, scenario_name
        )
    }

    /// Container path of the checkpoint file for a scenario
    pub fn checkpoint_container_path(&self, scenario_name: &str) -> String {
        format!(
            "{}/{}_{}.json",
            DEFAULT_CHECKPOINT_DIR, self.platform, scenario_name
        )
    }

    /// Build the complete `docker run` command around an inner harness
    /// command. The inner command runs after library installs, symlink
    /// rewiring, and checkpoint directory creation.
    pub fn build_run_command(&self, entrypoint: &str) -> Vec<String> {
        let mut cmd = vec!["run".to_string(), "--rm".to_string()];

        cmd.extend(self.env_args());
        cmd.extend(self.volume_args());

        let inner = format!(
            "{}; {}; mkdir -p {}; {}",
            self.lib_install_command(),
            self.symlink_command(),
            DEFAULT_CHECKPOINT_DIR,
            entrypoint
        );

        cmd.push("--entrypoint".to_string());
        cmd.push("bash".to_string());
        cmd.push(self.image.clone());
        cmd.push("-c".to_string());
        cmd.push(inner);

        cmd
    }
}
