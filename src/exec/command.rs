// src/exec/command.rs

//! Turning a script's `command` into something the supervisor can spawn.
//!
//! Rules, in order:
//! 1. A single string is split into argv with POSIX shell-word rules, unless
//!    `shell = true`, in which case it is kept as one shell line.
//! 2. A one-element list behaves exactly like rule 1.
//! 3. A longer list is chained with the platform's separator and always runs
//!    through a shell, whatever `shell` says.
//!
//! On Windows with PowerShell present, shell lines are handed to
//! `powershell -Command` explicitly instead of going through `cmd.exe`.

use std::fmt;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::{ScriptCommand, ScriptConfig};
use crate::errors::{DevloopError, Result};
use crate::types::Platform;

/// What to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecSpec {
    /// Exec `argv[0]` directly with the remaining arguments.
    Argv(Vec<String>),
    /// Hand the line to the platform's default shell (`sh -c` / `cmd /C`).
    ShellLine(String),
}

/// A fully resolved command plus whether it runs under a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    pub exec: ExecSpec,
    pub use_shell: bool,
}

impl BuiltCommand {
    /// Build a `tokio` command that inherits this process's stdio.
    pub fn to_command(&self) -> Command {
        let mut cmd = match &self.exec {
            ExecSpec::Argv(argv) => {
                let (program, args) = match argv.split_first() {
                    Some((program, args)) => (program.as_str(), args),
                    None => ("", &[][..]),
                };
                let mut c = Command::new(program);
                c.args(args);
                c
            }
            ExecSpec::ShellLine(line) => system_shell(line),
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }
}

#[cfg(not(windows))]
fn system_shell(line: &str) -> Command {
    let mut c = Command::new("sh");
    c.arg("-c").arg(line);
    c
}

/// `cmd.exe` does not parse MSVC-style argument quoting, so the line is
/// passed through verbatim.
#[cfg(windows)]
fn system_shell(line: &str) -> Command {
    let mut c = Command::new("cmd");
    c.arg("/C").raw_arg(line);
    c
}

impl fmt::Display for BuiltCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.exec {
            ExecSpec::Argv(argv) => f.write_str(&argv.join(" ")),
            ExecSpec::ShellLine(line) => f.write_str(line),
        }
    }
}

/// Separator used to chain a multi-command script on `platform`.
pub fn chain_separator(platform: Platform) -> &'static str {
    match platform {
        Platform::Posix => " && ",
        Platform::Windows { powershell: true } => "; ",
        Platform::Windows { powershell: false } => " & ",
    }
}

/// Build the concrete command for `script` on `platform`.
pub fn build_command(script: &ScriptConfig, platform: Platform) -> Result<BuiltCommand> {
    match &script.command {
        ScriptCommand::Line(line) => build_single(line, script.shell, platform),
        ScriptCommand::Sequence(seq) => match seq.as_slice() {
            [] => Err(DevloopError::config("command list is empty")),
            [only] => build_single(only, script.shell, platform),
            many => build_chain(many, platform),
        },
    }
}

fn build_single(line: &str, shell: bool, platform: Platform) -> Result<BuiltCommand> {
    if line.trim().is_empty() {
        return Err(DevloopError::config("command is empty"));
    }

    if shell {
        return Ok(shell_command(line.to_string(), platform));
    }

    let argv = shlex::split(line)
        .ok_or_else(|| DevloopError::config(format!("cannot split command: {line}")))?;
    if argv.is_empty() {
        return Err(DevloopError::config("command is empty"));
    }

    Ok(BuiltCommand {
        exec: ExecSpec::Argv(argv),
        use_shell: false,
    })
}

fn build_chain(commands: &[String], platform: Platform) -> Result<BuiltCommand> {
    if commands.iter().any(|c| c.trim().is_empty()) {
        return Err(DevloopError::config("command list contains an empty entry"));
    }
    let joined = commands.join(chain_separator(platform));
    Ok(shell_command(joined, platform))
}

fn shell_command(line: String, platform: Platform) -> BuiltCommand {
    let exec = match platform {
        Platform::Windows { powershell: true } => {
            ExecSpec::Argv(vec!["powershell".to_string(), "-Command".to_string(), line])
        }
        _ => ExecSpec::ShellLine(line),
    };
    BuiltCommand {
        exec,
        use_shell: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PWSH: Platform = Platform::Windows { powershell: true };
    const CMD: Platform = Platform::Windows { powershell: false };

    fn argv(words: &[&str]) -> ExecSpec {
        ExecSpec::Argv(words.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn single_line_is_split_into_words() {
        let built =
            build_command(&ScriptConfig::new("python3 -m 'http.server' 8000"), Platform::Posix)
                .unwrap();
        assert_eq!(built.exec, argv(&["python3", "-m", "http.server", "8000"]));
        assert!(!built.use_shell);
    }

    #[test]
    fn single_line_with_shell_stays_one_line() {
        let script = ScriptConfig::new("echo $HOME | wc -c").with_shell(true);
        let built = build_command(&script, Platform::Posix).unwrap();
        assert_eq!(built.exec, ExecSpec::ShellLine("echo $HOME | wc -c".into()));
        assert!(built.use_shell);
    }

    #[test]
    fn one_element_list_behaves_like_a_string() {
        let from_list = build_command(&ScriptConfig::new(vec!["node index.js"]), Platform::Posix);
        let from_str = build_command(&ScriptConfig::new("node index.js"), Platform::Posix);
        assert_eq!(from_list.unwrap(), from_str.unwrap());
    }

    #[test]
    fn chains_use_the_platform_separator_and_force_shell() {
        let script = ScriptConfig::new(vec!["npm run build", "npm start"]);

        let posix = build_command(&script, Platform::Posix).unwrap();
        assert_eq!(posix.exec, ExecSpec::ShellLine("npm run build && npm start".into()));
        assert!(posix.use_shell);

        let cmd = build_command(&script, CMD).unwrap();
        assert_eq!(cmd.exec, ExecSpec::ShellLine("npm run build & npm start".into()));

        let pwsh = build_command(&script, PWSH).unwrap();
        assert_eq!(
            pwsh.exec,
            argv(&["powershell", "-Command", "npm run build; npm start"])
        );
        assert!(pwsh.use_shell);
    }

    #[test]
    fn powershell_wraps_shell_lines_only() {
        let shell = build_command(&ScriptConfig::new("dir").with_shell(true), PWSH).unwrap();
        assert_eq!(shell.exec, argv(&["powershell", "-Command", "dir"]));

        let plain = build_command(&ScriptConfig::new("app.exe --port 1"), PWSH).unwrap();
        assert_eq!(plain.exec, argv(&["app.exe", "--port", "1"]));
        assert!(!plain.use_shell);
    }

    #[test]
    fn bad_shapes_are_configuration_errors() {
        for script in [
            ScriptConfig::new(""),
            ScriptConfig::new(Vec::<&str>::new()),
            ScriptConfig::new(vec!["make", "  "]),
            ScriptConfig::new("echo 'unterminated"),
        ] {
            let err = build_command(&script, Platform::Posix).unwrap_err();
            assert!(matches!(err, DevloopError::Configuration(_)), "{err}");
        }
    }

    #[test]
    fn display_matches_what_runs() {
        let built = build_command(&ScriptConfig::new("cargo run -- --port 3000"), Platform::Posix)
            .unwrap();
        assert_eq!(built.to_string(), "cargo run -- --port 3000");
    }

    fn spawned_args(built: &BuiltCommand) -> (String, Vec<String>) {
        let cmd = built.to_command();
        let inner = cmd.as_std();
        (
            inner.get_program().to_string_lossy().into_owned(),
            inner.get_args().map(|a| a.to_string_lossy().into_owned()).collect(),
        )
    }

    #[cfg(not(windows))]
    #[test]
    fn shell_lines_run_under_sh() {
        let built = BuiltCommand {
            exec: ExecSpec::ShellLine("echo \"a b\" && true".into()),
            use_shell: true,
        };
        let (program, args) = spawned_args(&built);
        assert_eq!(program, "sh");
        assert_eq!(args, ["-c", "echo \"a b\" && true"]);
    }

    #[cfg(windows)]
    #[test]
    fn shell_lines_reach_cmd_unquoted() {
        let built = build_command(&ScriptConfig::new(vec!["echo \"a b\"", "dir"]), CMD).unwrap();
        let (program, args) = spawned_args(&built);
        assert_eq!(program, "cmd");
        assert_eq!(args, ["/C", "echo \"a b\" & dir"]);
    }
}
