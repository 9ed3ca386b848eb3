// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] turns a script config into an argv or shell line.
//! - [`shell`] caches the PowerShell probe used on Windows.
//! - [`signal`] creates and signals process groups.
//! - [`supervisor`] owns the single live child and its restarts.
//! - [`backend`] is the trait the orchestrator drives, so tests can replace
//!   the supervisor with a fake.

pub mod backend;
pub mod command;
pub mod shell;
pub mod signal;
pub mod supervisor;

pub use backend::ProcessBackend;
pub use command::{build_command, chain_separator, BuiltCommand, ExecSpec};
pub use supervisor::ProcessSupervisor;
