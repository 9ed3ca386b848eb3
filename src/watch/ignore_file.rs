// src/watch/ignore_file.rs

//! Locating the ignore file that feeds the [`PathMatcher`](super::PathMatcher).

use std::path::{Path, PathBuf};

/// Project-specific ignore file, preferred over `.gitignore`.
pub const IGNORE_FILE_NAME: &str = "devloop.ignore";

/// Fallback ignore file.
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Find `name` in `start` or the closest of its parent directories.
pub fn find_file_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// The nearest `devloop.ignore`, or failing that the nearest `.gitignore`.
pub fn find_ignore_file(start: &Path) -> Option<PathBuf> {
    find_file_upwards(start, IGNORE_FILE_NAME)
        .or_else(|| find_file_upwards(start, GITIGNORE_FILE_NAME))
}
