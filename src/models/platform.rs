//! Platform Models
//!
//! Static configuration for the supported skill platforms and the registry
//! that resolves skills repository paths. The registry is built once at
//! startup from the environment and stays immutable for the lifetime of a
//! refinement run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Identifier for a platform under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformId {
    Confluence,
    Jira,
    Splunk,
    /// Scenario spans all platforms in one conversation
    CrossPlatform,
    /// Alias for cross-platform
    All,
}

impl PlatformId {
    /// All concrete platforms (excludes the cross-platform modes)
    pub const CONCRETE: [PlatformId; 3] =
        [PlatformId::Confluence, PlatformId::Jira, PlatformId::Splunk];

    /// Whether this is a cross-platform mode rather than a single platform
    pub fn is_cross_platform(&self) -> bool {
        matches!(self, PlatformId::CrossPlatform | PlatformId::All)
    }

    /// Human-readable display name (e.g. "Confluence", "Cross-Platform")
    pub fn title(&self) -> &'static str {
        match self {
            PlatformId::Confluence => "Confluence",
            PlatformId::Jira => "Jira",
            PlatformId::Splunk => "Splunk",
            PlatformId::CrossPlatform | PlatformId::All => "Cross-Platform",
        }
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformId::Confluence => write!(f, "confluence"),
            PlatformId::Jira => write!(f, "jira"),
            PlatformId::Splunk => write!(f, "splunk"),
            PlatformId::CrossPlatform => write!(f, "cross-platform"),
            PlatformId::All => write!(f, "all"),
        }
    }
}

/// Configuration for a single platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Platform identifier
    pub id: PlatformId,
    /// Environment variable overriding the skills repository path
    pub skills_path_env: String,
    /// Default subdirectory under the skills base path
    pub default_subdir: String,
    /// Plugin directory name within the skills repository
    pub plugin_name: String,
    /// Library directory name within the skills repository
    pub lib_name: String,
    /// Python package name of the library
    pub lib_package: String,
    /// Credential environment variables forwarded into the container
    pub env_vars: Vec<String>,
    /// Environment variable enabling mock mode inside the container
    pub mock_env_var: String,
    /// Subdirectory under the container scenarios directory
    pub scenarios_subdir: String,
}

impl PlatformConfig {
    fn confluence() -> Self {
        Self {
            id: PlatformId::Confluence,
            skills_path_env: "CONFLUENCE_SKILLS_PATH".to_string(),
            default_subdir: "Confluence-Assistant-Skills".to_string(),
            plugin_name: "confluence-assistant-skills".to_string(),
            lib_name: "confluence-as".to_string(),
            lib_package: "confluence_as".to_string(),
            env_vars: vec![
                "CONFLUENCE_API_TOKEN".to_string(),
                "CONFLUENCE_EMAIL".to_string(),
                "CONFLUENCE_SITE_URL".to_string(),
            ],
            mock_env_var: "CONFLUENCE_MOCK_MODE".to_string(),
            scenarios_subdir: "confluence".to_string(),
        }
    }

    fn jira() -> Self {
        Self {
            id: PlatformId::Jira,
            skills_path_env: "JIRA_SKILLS_PATH".to_string(),
            default_subdir: "Jira-Assistant-Skills".to_string(),
            plugin_name: "jira-assistant-skills".to_string(),
            lib_name: "jira-as".to_string(),
            lib_package: "jira_as".to_string(),
            env_vars: vec![
                "JIRA_API_TOKEN".to_string(),
                "JIRA_EMAIL".to_string(),
                "JIRA_SITE_URL".to_string(),
            ],
            mock_env_var: "JIRA_MOCK_MODE".to_string(),
            scenarios_subdir: "jira".to_string(),
        }
    }

    fn splunk() -> Self {
        Self {
            id: PlatformId::Splunk,
            skills_path_env: "SPLUNK_SKILLS_PATH".to_string(),
            default_subdir: "Splunk-Assistant-Skills".to_string(),
            plugin_name: "splunk-assistant-skills".to_string(),
            lib_name: "splunk-as".to_string(),
            lib_package: "splunk_as".to_string(),
            env_vars: vec![
                "SPLUNK_URL".to_string(),
                "SPLUNK_USERNAME".to_string(),
                "SPLUNK_PASSWORD".to_string(),
                "SPLUNK_HEC_TOKEN".to_string(),
            ],
            mock_env_var: "SPLUNK_MOCK_MODE".to_string(),
            scenarios_subdir: "splunk".to_string(),
        }
    }
}

/// Registry of platform configurations with resolved skills paths.
///
/// Environment lookups happen exactly once, in [`PlatformRegistry::from_env`];
/// after construction the registry is a plain immutable value.
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    configs: HashMap<PlatformId, PlatformConfig>,
    /// Base directory containing the skills repositories
    skills_base: PathBuf,
    /// Per-platform path overrides captured from the environment
    overrides: HashMap<PlatformId, PathBuf>,
}

impl PlatformRegistry {
    /// Build a registry with an explicit base path and overrides
    pub fn new(skills_base: PathBuf, overrides: HashMap<PlatformId, PathBuf>) -> Self {
        let mut configs = HashMap::new();
        for config in [
            PlatformConfig::confluence(),
            PlatformConfig::jira(),
            PlatformConfig::splunk(),
        ] {
            configs.insert(config.id, config);
        }

        Self {
            configs,
            skills_base,
            overrides,
        }
    }

    /// Build the registry from the process environment.
    ///
    /// `SKILLS_BASE_PATH` overrides the base directory (default: the parent
    /// of `project_root`); `{PLATFORM}_SKILLS_PATH` overrides the resolved
    /// path for an individual platform.
    pub fn from_env(project_root: &Path) -> Self {
        let skills_base = std::env::var("SKILLS_BASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                project_root
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| project_root.to_path_buf())
            });

        let mut registry = Self::new(skills_base, HashMap::new());

        for id in PlatformId::CONCRETE {
            let env_var = &registry.configs[&id].skills_path_env;
            if let Ok(path) = std::env::var(env_var) {
                registry.overrides.insert(id, PathBuf::from(path));
            }
        }

        registry
    }

    /// Get the configuration for a concrete platform
    pub fn get(&self, id: PlatformId) -> Option<&PlatformConfig> {
        self.configs.get(&id)
    }

    /// Expand a platform mode into the concrete platforms it requires
    pub fn required_platforms(&self, id: PlatformId) -> Vec<PlatformId> {
        if id.is_cross_platform() {
            PlatformId::CONCRETE.to_vec()
        } else {
            vec![id]
        }
    }

    /// The first required platform; its skills path hosts the fix session
    pub fn primary_platform(&self, id: PlatformId) -> PlatformId {
        self.required_platforms(id)[0]
    }

    /// Resolve the skills repository path for a concrete platform
    pub fn skills_path(&self, id: PlatformId) -> PathBuf {
        if let Some(path) = self.overrides.get(&id) {
            return path.clone();
        }
        let subdir = self
            .configs
            .get(&id)
            .map(|c| c.default_subdir.as_str())
            .unwrap_or_default();
        self.skills_base.join(subdir)
    }

    /// Locate the plugin directory within a platform's skills repository.
    ///
    /// Tries `<skills>/plugins/<plugin>` first, then `<skills>/<plugin>`.
    pub fn plugin_path(&self, id: PlatformId) -> Option<PathBuf> {
        let config = self.configs.get(&id)?;
        let skills_path = self.skills_path(id);

        let nested = skills_path.join("plugins").join(&config.plugin_name);
        if nested.exists() {
            return Some(nested);
        }
        let flat = skills_path.join(&config.plugin_name);
        if flat.exists() {
            return Some(flat);
        }
        None
    }

    /// Locate the library directory within a platform's skills repository
    pub fn lib_path(&self, id: PlatformId) -> Option<PathBuf> {
        let config = self.configs.get(&id)?;
        let path = self.skills_path(id).join(&config.lib_name);
        path.exists().then_some(path)
    }
}
