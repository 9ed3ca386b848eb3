// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::BrowserKind;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// browser = "firefox"
/// include_only = ["*.py"]
/// poll_interval = 500
///
/// [script.default]
/// command = "python3 app.py"
/// url = "http://localhost:5000"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All scripts from `[script.<name>]`.
    #[serde(default)]
    pub script: BTreeMap<String, ScriptConfig>,
}

/// Validated configuration. Built through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    script: BTreeMap<String, ScriptConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        script: BTreeMap<String, ScriptConfig>,
    ) -> Self {
        Self { config, script }
    }

    pub fn settings(&self) -> &ConfigSection {
        &self.config
    }

    pub fn scripts(&self) -> &BTreeMap<String, ScriptConfig> {
        &self.script
    }

    /// Look up a script by name, ignoring ASCII case.
    pub fn find_script(&self, name: &str) -> Option<(&str, &ScriptConfig)> {
        self.script
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// `[config]` section. All durations are milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigSection {
    #[serde(default)]
    pub browser: BrowserKind,

    /// Only paths matching one of these globs are observed. Empty = all.
    #[serde(default)]
    pub include_only: Vec<String>,

    /// Debounce window for change detection.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Base delay of the browser reload backoff.
    #[serde(default = "default_browser_wait_interval")]
    pub browser_wait_interval: u64,

    /// Optional cap on the reload backoff delay; `0` or absent = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_browser_wait_interval: Option<u64>,

    /// Period of the trigger drain loop.
    #[serde(default = "default_trigger_tick")]
    pub trigger_tick: u64,

    /// Grace period between the termination signal and a forced kill.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout: u64,

    /// Suppress events for files whose content hash did not change.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_poll_interval() -> u64 {
    500
}

fn default_browser_wait_interval() -> u64 {
    1000
}

fn default_trigger_tick() -> u64 {
    100
}

fn default_stop_timeout() -> u64 {
    5000
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            browser: BrowserKind::default(),
            include_only: Vec::new(),
            poll_interval: default_poll_interval(),
            browser_wait_interval: default_browser_wait_interval(),
            max_browser_wait_interval: None,
            trigger_tick: default_trigger_tick(),
            stop_timeout: default_stop_timeout(),
            use_hash: false,
        }
    }
}

impl ConfigSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    pub fn browser_wait_interval(&self) -> Duration {
        Duration::from_millis(self.browser_wait_interval)
    }

    pub fn max_browser_wait_interval(&self) -> Option<Duration> {
        self.max_browser_wait_interval
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn trigger_tick(&self) -> Duration {
        Duration::from_millis(self.trigger_tick)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout)
    }
}

/// The `command` of a script: one command line, or several to chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ScriptCommand {
    Line(String),
    Sequence(Vec<String>),
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptCommand::Line(line) => f.write_str(line),
            ScriptCommand::Sequence(seq) => write!(f, "{}", seq.join(" ; ")),
        }
    }
}

impl From<&str> for ScriptCommand {
    fn from(s: &str) -> Self {
        ScriptCommand::Line(s.to_string())
    }
}

impl From<Vec<&str>> for ScriptCommand {
    fn from(v: Vec<&str>) -> Self {
        ScriptCommand::Sequence(v.into_iter().map(String::from).collect())
    }
}

/// `[script.<name>]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScriptConfig {
    pub command: ScriptCommand,

    /// Run a single command through the shell instead of exec'ing it.
    #[serde(default)]
    pub shell: bool,

    /// Page to open and reload; no browser is started when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ScriptConfig {
    pub fn new(command: impl Into<ScriptCommand>) -> Self {
        Self {
            command: command.into(),
            shell: false,
            url: None,
        }
    }

    pub fn with_shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// The configured URL, if it is non-empty.
    pub fn browser_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Contents written by `devloop init`.
pub fn default_config_toml() -> anyhow::Result<String> {
    let mut script = BTreeMap::new();
    script.insert(
        "default".to_string(),
        ScriptConfig::new("echo 'hello'").with_shell(true),
    );
    let raw = RawConfigFile {
        config: ConfigSection::default(),
        script,
    };
    Ok(toml::to_string_pretty(&raw)?)
}
