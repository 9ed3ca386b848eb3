// src/engine/mod.rs

//! Reload engine.
//!
//! - [`queue`]: deferred triggers drained on a short tick.
//! - [`backoff`] and [`reload`]: the browser reload retry machine.
//! - [`orchestrator`]: reacts to changes and manual commands.
//! - [`runtime`]: the async session around an orchestrator (drain loop,
//!   control loop, Ctrl-C).

use std::path::PathBuf;

use crate::errors::DevloopError;

pub mod backoff;
pub mod input;
pub mod orchestrator;
pub mod queue;
pub mod reload;
pub mod runtime;

pub use backoff::BackoffPolicy;
pub use input::{spawn_stdin_reader, ManualCommand};
pub use orchestrator::ReloadOrchestrator;
pub use queue::{Trigger, TriggerQueue};
pub use reload::{BrowserReload, ReloadQueue};
pub use runtime::{Session, SessionOptions};

/// Events consumed by the session's control loop.
#[derive(Debug)]
pub enum ControlEvent {
    /// A debounced filesystem change.
    Changed(PathBuf),
    /// A manual command typed by the user.
    Command(ManualCommand),
    /// An error that ends the session.
    Fatal(DevloopError),
    /// Ctrl-C.
    Interrupted,
}

/// Why a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// `ex` or Ctrl-C.
    Stopped,
    /// `rc`: the caller should load the configuration again.
    ReloadConfig,
    Failed(DevloopError),
}
