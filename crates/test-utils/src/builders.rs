#![allow(dead_code)]

use std::collections::BTreeMap;

use devloop::config::{ConfigFile, ConfigSection, RawConfigFile, ScriptConfig};
use devloop::errors::DevloopError;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                script: BTreeMap::new(),
            },
        }
    }

    pub fn with_script(mut self, name: &str, script: ScriptConfig) -> Self {
        self.config.script.insert(name.to_string(), script);
        self
    }

    pub fn with_include(mut self, pattern: &str) -> Self {
        self.config.config.include_only.push(pattern.to_string());
        self
    }

    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.config.config.poll_interval = ms;
        self
    }

    pub fn with_browser_wait_interval(mut self, ms: u64) -> Self {
        self.config.config.browser_wait_interval = ms;
        self
    }

    pub fn with_max_browser_wait_interval(mut self, ms: u64) -> Self {
        self.config.config.max_browser_wait_interval = Some(ms);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> Result<ConfigFile, DevloopError> {
        ConfigFile::try_from(self.config)
    }
}
