// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::watch::hash::compute_file_hash;

/// Last seen content hash per file.
///
/// Used to drop events for files that were touched or re-saved without
/// their contents changing.
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self {
            hashes: HashMap::new(),
        }
    }

    /// Returns true unless `path` hashes to exactly what was recorded last
    /// time. Records the new hash either way.
    ///
    /// Any failure to read the file (deleted, permission denied, ...) counts
    /// as a change and forgets the cached hash.
    pub fn has_changed(&mut self, path: &Path) -> bool {
        let hash = match compute_file_hash(path) {
            Ok(h) => h,
            Err(err) => {
                debug!(?path, error = %err, "cannot hash file; assuming changed");
                self.invalidate(path);
                return true;
            }
        };

        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            Some(previous) if previous == hash => {
                debug!(?path, "content hash unchanged");
                false
            }
            _ => true,
        }
    }

    /// Forget the cached hash for a file.
    pub fn invalidate(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!("invalidated cache for {:?}", path);
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resaving_identical_content_is_not_a_change() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("app.py");
        let mut cache = FileCache::new();

        std::fs::write(&file, "print('a')")?;
        assert!(cache.has_changed(&file), "first sighting counts as a change");
        std::fs::write(&file, "print('a')")?;
        assert!(!cache.has_changed(&file));
        std::fs::write(&file, "print('b')")?;
        assert!(cache.has_changed(&file));
        Ok(())
    }

    #[test]
    fn unreadable_files_are_assumed_changed() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("gone.txt");
        let mut cache = FileCache::new();

        std::fs::write(&file, "x")?;
        assert!(cache.has_changed(&file));
        std::fs::remove_file(&file)?;
        assert!(cache.has_changed(&file));
        assert!(cache.is_empty());
        Ok(())
    }
}
