//! Path Utilities
//!
//! Functions for resolving the directories the refinement loop depends on:
//! the host-side checkpoint directory and the credential secrets directory.

use std::path::{Path, PathBuf};

use crate::utils::error::AppResult;

/// Checkpoint directory shared with the test container.
///
/// The same absolute path is bind-mounted into the container, so the
/// in-container harness and this process read and write the same files.
pub const DEFAULT_CHECKPOINT_DIR: &str = "/tmp/checkpoints";

/// Get the default checkpoint directory
pub fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CHECKPOINT_DIR)
}

/// Get the secrets directory under a project root
pub fn secrets_dir(project_root: &Path) -> PathBuf {
    project_root.join("secrets")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
