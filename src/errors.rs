// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! The variants follow the failure classes the reload engine distinguishes:
//! configuration problems abort before anything starts, spawn failures leave
//! the supervisor idle, termination races are tolerated, and browser errors
//! carry their own transient/fatal split (see [`BrowserError`]).

use thiserror::Error;

pub use crate::browser::BrowserError;

#[derive(Error, Debug)]
pub enum DevloopError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("failed to spawn `{command}`: {source}")]
    ProcessSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process group already gone: {0}")]
    ProcessTerminationRace(String),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DevloopError {
    pub fn config(msg: impl Into<String>) -> Self {
        DevloopError::Configuration(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DevloopError>;
