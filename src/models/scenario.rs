//! Scenario Models
//!
//! A scenario is an ordered sequence of conversational test prompts stored
//! as a `.prompts` file inside the test container. The refinement loop never
//! reads the prompt file itself; it addresses a scenario by its
//! `(platform, name)` identity.

use serde::{Deserialize, Serialize};

use super::platform::PlatformId;

/// Identifies one test scenario on one platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scenario {
    /// Platform (or cross-platform mode) the scenario targets
    pub platform: PlatformId,
    /// Scenario name, matching the `.prompts` file stem (e.g. "page", "issue")
    pub name: String,
}

impl Scenario {
    /// Create a new scenario identifier
    pub fn new(platform: PlatformId, name: impl Into<String>) -> Self {
        Self {
            platform,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.platform, self.name)
    }
}
