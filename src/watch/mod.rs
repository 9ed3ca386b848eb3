// src/watch/mod.rs

//! File watching and change detection.
//!
//! - [`PathMatcher`] decides which paths are observed (ignore file plus
//!   optional include globs).
//! - [`ChangeWatcher`] filters raw events and debounces them into change
//!   signals, optionally verifying content with blake3 hashes.
//! - [`spawn_watcher`] wires a `notify` watcher to a `ChangeWatcher`.
//!
//! Nothing here knows about processes or browsers; the change callback is
//! supplied by the engine.

pub mod cache;
pub mod debounce;
pub mod hash;
pub mod ignore_file;
pub mod matcher;
pub mod path_utils;
pub mod watcher;

pub use debounce::{ChangeWatcher, FsEventKind};
pub use ignore_file::{find_file_upwards, find_ignore_file};
pub use matcher::PathMatcher;
pub use watcher::{spawn_watcher, WatcherHandle};
