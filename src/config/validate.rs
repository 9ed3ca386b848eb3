// src/config/validate.rs

use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile, ScriptCommand, ScriptConfig};
use crate::errors::{DevloopError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DevloopError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.script))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_scripts(cfg)?;
    validate_global_config(&cfg.config)?;
    for (name, script) in cfg.script.iter() {
        validate_script(name, script)?;
    }
    Ok(())
}

fn ensure_has_scripts(cfg: &RawConfigFile) -> Result<()> {
    if cfg.script.is_empty() {
        return Err(DevloopError::config(
            "config must contain at least one [script.<name>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &ConfigSection) -> Result<()> {
    for (key, value) in [
        ("poll_interval", cfg.poll_interval),
        ("browser_wait_interval", cfg.browser_wait_interval),
        ("trigger_tick", cfg.trigger_tick),
    ] {
        if value == 0 {
            return Err(DevloopError::config(format!(
                "[config].{key} must be >= 1 (got 0)"
            )));
        }
    }

    if let Some(cap) = cfg.max_browser_wait_interval.filter(|ms| *ms > 0) {
        if cap < cfg.browser_wait_interval {
            return Err(DevloopError::config(format!(
                "[config].max_browser_wait_interval ({cap}) must not be smaller than browser_wait_interval ({})",
                cfg.browser_wait_interval
            )));
        }
    }

    Ok(())
}

/// Reject script commands that can never produce a runnable process.
pub fn validate_script(name: &str, script: &ScriptConfig) -> Result<()> {
    match &script.command {
        ScriptCommand::Line(line) if line.trim().is_empty() => Err(DevloopError::config(
            format!("script '{name}' has an empty command"),
        )),
        ScriptCommand::Sequence(seq) if seq.is_empty() => Err(DevloopError::config(format!(
            "script '{name}' has an empty command list"
        ))),
        ScriptCommand::Sequence(seq) if seq.iter().any(|c| c.trim().is_empty()) => {
            Err(DevloopError::config(format!(
                "script '{name}' has an empty entry in its command list"
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn raw(script: ScriptConfig) -> RawConfigFile {
        let mut scripts = BTreeMap::new();
        scripts.insert("default".to_string(), script);
        RawConfigFile {
            config: ConfigSection::default(),
            script: scripts,
        }
    }

    #[test]
    fn accepts_a_minimal_config() {
        assert!(ConfigFile::try_from(raw(ScriptConfig::new("node index.js"))).is_ok());
    }

    #[test]
    fn rejects_config_without_scripts() {
        let cfg = RawConfigFile {
            config: ConfigSection::default(),
            script: BTreeMap::new(),
        };
        let err = ConfigFile::try_from(cfg).unwrap_err();
        assert!(matches!(err, DevloopError::Configuration(_)));
    }

    #[test]
    fn rejects_empty_command_shapes() {
        for script in [
            ScriptConfig::new("   "),
            ScriptConfig::new(Vec::<&str>::new()),
            ScriptConfig::new(vec!["npm run build", ""]),
        ] {
            let err = ConfigFile::try_from(raw(script)).unwrap_err();
            assert!(matches!(err, DevloopError::Configuration(_)), "{err}");
        }
    }

    #[test]
    fn rejects_zero_intervals_and_small_caps() {
        let mut cfg = raw(ScriptConfig::new("true"));
        cfg.config.poll_interval = 0;
        assert!(ConfigFile::try_from(cfg).is_err());

        let mut cfg = raw(ScriptConfig::new("true"));
        cfg.config.max_browser_wait_interval = Some(10);
        assert!(ConfigFile::try_from(cfg).is_err());

        let mut cfg = raw(ScriptConfig::new("true"));
        cfg.config.max_browser_wait_interval = Some(0);
        assert!(ConfigFile::try_from(cfg).is_ok());
    }
}
