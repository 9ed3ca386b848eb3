// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `devloop`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devloop",
    version,
    about = "Restart a command on file changes and reload the browser pointed at it.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: the nearest `Devloop.toml` in the working directory or one
    /// of its parents.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEVLOOP_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a script from the config and reload it on every change.
    Run {
        /// Name of the `[script.<name>]` entry to run.
        #[arg(default_value = "default")]
        script: String,

        /// Parse + validate, print the resolved command, but don't start it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a default `Devloop.toml` into the working directory.
    Init,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_to_the_default_script() {
        let args = CliArgs::try_parse_from(["devloop", "run"]).unwrap();
        match args.command {
            Command::Run { script, dry_run } => {
                assert_eq!(script, "default");
                assert!(!dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let args = CliArgs::try_parse_from([
            "devloop", "run", "web", "--config", "cfg/Devloop.toml", "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(args.config.as_deref(), Some("cfg/Devloop.toml"));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
