// src/engine/input.rs

//! Line commands typed into the terminal while a session runs.

use std::fmt;
use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualCommand {
    /// `ex`: stop the session.
    Exit,
    /// `rs`: restart the process and schedule a browser reload.
    Restart,
    /// `rb`: reload the browser page.
    RefreshBrowser,
    /// `rc`: stop, reload the configuration, start a new session.
    ReloadConfig,
    Unknown(String),
}

impl ManualCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim().to_lowercase();
        let cmd = match line.as_str() {
            "" => return None,
            "ex" => ManualCommand::Exit,
            "rs" => ManualCommand::Restart,
            "rb" => ManualCommand::RefreshBrowser,
            "rc" => ManualCommand::ReloadConfig,
            _ => ManualCommand::Unknown(line),
        };
        Some(cmd)
    }

    /// One-line usage hint shown at startup.
    pub fn help(browser: bool) -> String {
        if browser {
            "input `rs` to restart, `rb` to refresh the browser page, `rc` to reload the configuration, `ex` to stop".to_string()
        } else {
            "input `rs` to restart, `rc` to reload the configuration, `ex` to stop".to_string()
        }
    }
}

impl fmt::Display for ManualCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManualCommand::Exit => f.write_str("ex"),
            ManualCommand::Restart => f.write_str("rs"),
            ManualCommand::RefreshBrowser => f.write_str("rb"),
            ManualCommand::ReloadConfig => f.write_str("rc"),
            ManualCommand::Unknown(s) => f.write_str(s),
        }
    }
}

/// Forward stdin lines into a channel from a dedicated thread.
///
/// One reader serves every session of the process. The thread ends at EOF
/// or once the receiver is dropped.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("devloop-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to read stdin");
                        break;
                    }
                }
            }
            debug!("stdin closed; manual commands disabled");
        });
    if let Err(err) = spawned {
        warn!(error = %err, "could not start the input reader; manual commands disabled");
    }
    rx
}
