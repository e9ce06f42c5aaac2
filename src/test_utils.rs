//! Test utilities shared across test modules

use crate::paths::Paths;
use tempfile::TempDir;

/// Build a [`Paths`] rooted in a temporary directory, mimicking the real
/// ~/.claude layout without touching the environment.
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::with_root(temp_dir.path().join(".claude"))
}
