// src/config/mod.rs

//! Configuration loading and validation for devloop.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load and discover a config file on disk (`loader.rs`).
//! - Validate script shapes and interval sanity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{discover_config_path, load_and_validate, load_from_path, CONFIG_FILE_NAME};
pub use model::{
    default_config_toml, ConfigFile, ConfigSection, RawConfigFile, ScriptCommand, ScriptConfig,
};
pub use validate::validate_script;
