// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::watch::debounce::{ChangeWatcher, FsEventKind};

/// Keeps the OS watcher and the debounce task alive.
///
/// Dropping the handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Watch `root` recursively and feed every event through `change_watcher`.
///
/// The notify callback runs on notify's own thread and only forwards the raw
/// event into a channel; filtering, debouncing and hashing happen on a tokio
/// task. Must be called from within a tokio runtime.
pub fn spawn_watcher(root: impl Into<PathBuf>, mut change_watcher: ChangeWatcher) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Receiver gone means the session is over.
                let _ = event_tx.send(event);
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", root))?;

    info!(root = ?root, "file watcher started");

    let task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let kind = FsEventKind::from(&event.kind);
            for path in &event.paths {
                change_watcher.on_filesystem_event(path, kind);
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        task,
    })
}
