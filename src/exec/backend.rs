// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The orchestrator talks to a `ProcessBackend` instead of a concrete
//! supervisor, so tests can swap in a fake that records lifecycle calls
//! without spawning anything. [`ProcessSupervisor`] is the production
//! implementation.

use crate::exec::supervisor::ProcessSupervisor;
use crate::types::BoxFuture;

/// Start/stop/restart of the one supervised process.
pub trait ProcessBackend: Send + Sync {
    fn start(&self) -> BoxFuture<'_, ()>;
    fn stop(&self) -> BoxFuture<'_, ()>;
    fn restart(&self) -> BoxFuture<'_, ()>;
}

impl ProcessBackend for ProcessSupervisor {
    fn start(&self) -> BoxFuture<'_, ()> {
        Box::pin(ProcessSupervisor::start(self))
    }

    fn stop(&self) -> BoxFuture<'_, ()> {
        Box::pin(ProcessSupervisor::stop(self))
    }

    fn restart(&self) -> BoxFuture<'_, ()> {
        Box::pin(ProcessSupervisor::restart(self))
    }
}
