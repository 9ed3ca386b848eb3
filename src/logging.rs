// src/logging.rs

//! `tracing` subscriber for the CLI.
//!
//! `--log-level` sets the level of devloop's own events and keeps
//! dependencies at `warn`. Without it, `DEVLOOP_LOG` is read as a full
//! `EnvFilter` directive list (`devloop=debug,reqwest=info`). Output goes to
//! stderr; the supervised command owns stdout.

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "DEVLOOP_LOG";

const DEFAULT_DIRECTIVES: &str = "warn,devloop=info";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let directives = match (cli_level, env.map(str::trim)) {
        (Some(level), _) => {
            let name = level
                .to_possible_value()
                .map(|v| v.get_name().to_owned())
                .unwrap_or_else(|| "info".to_owned());
            format!("warn,devloop={name}")
        }
        (None, Some(env)) if !env.is_empty() => env.to_owned(),
        _ => DEFAULT_DIRECTIVES.to_owned(),
    };
    EnvFilter::try_new(&directives).with_context(|| format!("invalid log filter `{directives}`"))
}
