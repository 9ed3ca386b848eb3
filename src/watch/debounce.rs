// src/watch/debounce.rs

//! Leading-edge debounce of raw filesystem events.

use std::fmt;
use std::path::{Component, Path};
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::AccessKind;
use tracing::{debug, trace};

use crate::watch::cache::FileCache;
use crate::watch::matcher::PathMatcher;

/// Directory names whose contents never count as source changes.
pub const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Category of a raw filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Modified,
    Removed,
    Moved,
    /// File opened, read, or closed. Carries no content change by itself.
    Accessed,
    /// Closed after being opened for writing.
    ClosedWrite,
    Other,
}

impl FsEventKind {
    /// Open/close style events that are ignored by the watcher.
    pub fn is_access(self) -> bool {
        matches!(self, FsEventKind::Accessed | FsEventKind::ClosedWrite)
    }
}

impl From<&EventKind> for FsEventKind {
    fn from(kind: &EventKind) -> Self {
        use notify::event::{AccessMode, ModifyKind};

        match kind {
            EventKind::Create(_) => FsEventKind::Created,
            EventKind::Modify(ModifyKind::Name(_)) => FsEventKind::Moved,
            EventKind::Modify(_) => FsEventKind::Modified,
            EventKind::Remove(_) => FsEventKind::Removed,
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => FsEventKind::ClosedWrite,
            EventKind::Access(_) => FsEventKind::Accessed,
            EventKind::Any | EventKind::Other => FsEventKind::Other,
        }
    }
}

/// True if any component of `path` is a version-control metadata directory.
pub fn is_vcs_path(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => VCS_DIRS.iter().any(|vcs| name == *vcs),
        _ => false,
    })
}

/// Turns raw events into at most one change signal per poll interval.
///
/// The first qualifying event after a quiet period fires immediately,
/// everything else inside `poll_interval` of it is dropped. When content
/// verification is enabled, an event whose file hashes to the same content
/// as last time is dropped without moving the debounce window.
pub struct ChangeWatcher {
    matcher: PathMatcher,
    poll_interval: Duration,
    last_event: Option<Instant>,
    cache: Option<FileCache>,
    on_change: Box<dyn FnMut(&Path) + Send>,
}

impl fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("matcher", &self.matcher)
            .field("poll_interval", &self.poll_interval)
            .field("last_event", &self.last_event)
            .field("use_hash", &self.cache.is_some())
            .finish()
    }
}

impl ChangeWatcher {
    pub fn new<F>(matcher: PathMatcher, poll_interval: Duration, on_change: F) -> Self
    where
        F: FnMut(&Path) + Send + 'static,
    {
        Self {
            matcher,
            poll_interval,
            last_event: None,
            cache: None,
            on_change: Box::new(on_change),
        }
    }

    /// Enable blake3 content verification of changed files.
    pub fn with_content_hashing(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(FileCache::new);
        self
    }

    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    /// Handle one raw event. Returns true if it produced a change signal.
    pub fn on_filesystem_event(&mut self, path: &Path, kind: FsEventKind) -> bool {
        self.on_filesystem_event_at(path, kind, Instant::now())
    }

    pub fn on_filesystem_event_at(&mut self, path: &Path, kind: FsEventKind, now: Instant) -> bool {
        if !self.qualifies(path, kind) {
            return false;
        }

        if let Some(last) = self.last_event {
            if now.saturating_duration_since(last) <= self.poll_interval {
                trace!(?path, "inside debounce window");
                // Keep the hash current so a later revert is still seen.
                if let Some(cache) = self.cache.as_mut() {
                    cache.has_changed(path);
                }
                return false;
            }
        }

        if let Some(cache) = self.cache.as_mut() {
            if !cache.has_changed(path) {
                return false;
            }
        }

        self.last_event = Some(now);
        debug!(?path, ?kind, "change detected");
        (self.on_change)(path);
        true
    }

    fn qualifies(&self, path: &Path, kind: FsEventKind) -> bool {
        if kind.is_access() {
            return false;
        }
        if is_vcs_path(path) {
            return false;
        }
        if self.matcher.is_ignored(path) {
            trace!(?path, "ignored");
            return false;
        }
        if !self.matcher.is_included(path) {
            trace!(?path, "not in include set");
            return false;
        }
        true
    }
}
