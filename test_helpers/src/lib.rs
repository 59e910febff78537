//! Test utilities shared across the workspace.
//!
//! Tests that render plots or write configuration files put them under
//! `test_output/` at the workspace root so the artifacts can be inspected
//! after a run.

use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Workspace root not found: {0}")]
    WorkspaceRootNotFound(String),
}

/// Walk up from the current directory to the first `Cargo.toml` that
/// declares a `[workspace]`.
pub fn find_workspace_root() -> Result<PathBuf, TestHelperError> {
    let start = env::current_dir()
        .map_err(|e| TestHelperError::WorkspaceRootNotFound(format!("no current dir: {e}")))?;

    start
        .ancestors()
        .find(|dir| is_workspace_manifest(&dir.join("Cargo.toml")))
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            TestHelperError::WorkspaceRootNotFound(format!(
                "no [workspace] manifest above {}",
                start.display()
            ))
        })
}

fn is_workspace_manifest(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .map(|content| content.contains("[workspace]"))
        .unwrap_or(false)
}

static WORKSPACE_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_workspace_root().expect("Failed to find workspace root"));

/// Directory for test artifacts, created on first use.
pub fn get_output_dir() -> PathBuf {
    let dir = WORKSPACE_ROOT.join("test_output");
    std::fs::create_dir_all(&dir).expect("Failed to create test output directory");
    dir
}

/// Path of a named artifact inside [`get_output_dir`].
pub fn output_path(name: &str) -> PathBuf {
    get_output_dir().join(name)
}
