//! Path utilities for facewatch.

use std::path::{Path, PathBuf};

/// Expands a leading `~` or `~/` to the user's home directory.
/// Other paths, and all paths when no home directory is known, are
/// returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
