// src/watch/matcher.rs

//! Ignore/include decisions for changed paths.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;

use crate::watch::ignore_file::find_ignore_file;
use crate::watch::path_utils::relative_str;

/// Answers whether a path under the watch root should be observed.
///
/// - The ignore set uses gitignore semantics, rooted at the directory of the
///   ignore file it was read from.
/// - The include set (optional) is a list of globs matched against the path
///   relative to the watch root; a glob without `/` matches at any depth.
#[derive(Clone)]
pub struct PathMatcher {
    root: PathBuf,
    ignore: Gitignore,
    include: Option<GlobSet>,
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMatcher")
            .field("root", &self.root)
            .field("ignore_rules", &self.ignore.num_ignores())
            .field("include", &self.include.as_ref().map(GlobSet::len))
            .finish()
    }
}

impl PathMatcher {
    /// A matcher that observes everything under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore: Gitignore::empty(),
            include: None,
        }
    }

    /// Build the session matcher: discovered ignore file plus `include_only`.
    pub fn discover(root: impl Into<PathBuf>, include_only: &[String]) -> Result<Self> {
        let root = root.into();
        let mut matcher = Self::new(root.clone());
        if let Some(file) = find_ignore_file(&root) {
            matcher = matcher.with_ignore_file(&file)?;
        }
        matcher.with_include(include_only)
    }

    /// Use the rules of one gitignore-style file.
    pub fn with_ignore_file(mut self, file: &Path) -> Result<Self> {
        let base = file.parent().unwrap_or(&self.root);
        let base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
        let mut builder = GitignoreBuilder::new(base);
        if let Some(err) = builder.add(file) {
            return Err(err).with_context(|| format!("reading ignore file {:?}", file));
        }
        self.ignore = builder
            .build()
            .with_context(|| format!("compiling ignore file {:?}", file))?;
        debug!(file = ?file, rules = self.ignore.num_ignores(), "loaded ignore rules");
        Ok(self)
    }

    /// Use literal gitignore lines, rooted at the watch root.
    pub fn with_ignore_lines<S: AsRef<str>>(mut self, lines: &[S]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(&self.root);
        for line in lines {
            builder
                .add_line(None, line.as_ref())
                .with_context(|| format!("invalid ignore pattern: {}", line.as_ref()))?;
        }
        self.ignore = builder.build().context("compiling ignore patterns")?;
        Ok(self)
    }

    /// Restrict observation to paths matching one of `patterns`. An empty
    /// list clears the include set.
    pub fn with_include<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        if patterns.is_empty() {
            self.include = None;
            return Ok(self);
        }
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let pat = pat.as_ref().trim_start_matches("./");
            let glob = GlobBuilder::new(pat)
                .literal_separator(false)
                .build()
                .with_context(|| format!("invalid include pattern: {pat}"))?;
            builder.add(glob);
            if !pat.contains('/') {
                let anywhere = GlobBuilder::new(&format!("**/{pat}"))
                    .build()
                    .with_context(|| format!("invalid include pattern: {pat}"))?;
                builder.add(anywhere);
            }
        }
        self.include = Some(builder.build()?);
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn has_include_set(&self) -> bool {
        self.include.is_some()
    }

    /// True if the ignore rules exclude `path` or one of its parents.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.ignore.is_empty() {
            return false;
        }
        let candidate = if path.is_absolute() {
            if !path.starts_with(self.ignore.path()) {
                return false;
            }
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let candidate = match candidate.strip_prefix(self.ignore.path()) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => return false,
        };
        self.ignore
            .matched_path_or_any_parents(&candidate, path.is_dir())
            .is_ignore()
    }

    /// True if there is no include set, or `path` matches it.
    pub fn is_included(&self, path: &Path) -> bool {
        let Some(include) = &self.include else {
            return true;
        };
        let rel = if path.is_absolute() {
            match relative_str(&self.root, path) {
                Some(rel) => rel,
                None => return false,
            }
        } else {
            path.to_string_lossy().replace('\\', "/")
        };
        include.is_match(&rel)
    }

    /// Observed = not ignored and included.
    pub fn matches(&self, path: &Path) -> bool {
        !self.is_ignored(path) && self.is_included(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matcher_observes_everything() {
        let m = PathMatcher::new("/project");
        assert!(m.matches(Path::new("/project/src/main.rs")));
        assert!(!m.has_include_set());
    }

    #[test]
    fn ignore_lines_cover_files_and_directories() -> Result<()> {
        let m = PathMatcher::new("/project").with_ignore_lines(&["target/", "*.log"])?;
        assert!(m.is_ignored(Path::new("/project/debug.log")));
        assert!(m.is_ignored(Path::new("/project/target/debug/app")));
        assert!(!m.is_ignored(Path::new("/project/src/lib.rs")));
        Ok(())
    }

    #[test]
    fn include_patterns_without_slash_match_at_any_depth() -> Result<()> {
        let m = PathMatcher::new("/project").with_include(&["*.py", "templates/**"])?;
        assert!(m.is_included(Path::new("/project/app.py")));
        assert!(m.is_included(Path::new("/project/pkg/views.py")));
        assert!(m.is_included(Path::new("/project/templates/base.html")));
        assert!(!m.is_included(Path::new("/project/static/site.css")));
        Ok(())
    }

    #[test]
    fn ignore_wins_over_include() -> Result<()> {
        let m = PathMatcher::new("/project")
            .with_ignore_lines(&["venv/"])?
            .with_include(&["*.py"])?;
        assert!(!m.matches(Path::new("/project/venv/lib/site.py")));
        assert!(m.matches(Path::new("/project/main.py")));
        Ok(())
    }

    #[test]
    fn discover_reads_the_ignore_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().canonicalize()?;
        std::fs::write(root.join("devloop.ignore"), "*.tmp\n")?;

        let m = PathMatcher::discover(&root, &[])?;
        assert!(m.is_ignored(&root.join("scratch.tmp")));
        assert!(!m.is_ignored(&root.join("main.rs")));
        Ok(())
    }
}
