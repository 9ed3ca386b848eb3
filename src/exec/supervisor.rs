// src/exec/supervisor.rs

//! Lifecycle of the single supervised child process.

use std::time::Duration;

use tokio::process::Child;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::errors::DevloopError;
use crate::exec::command::BuiltCommand;
use crate::exec::signal;

const GROUP_POLL: Duration = Duration::from_millis(25);

/// The live child plus the id of the process group it leads.
#[derive(Debug)]
struct ProcessHandle {
    child: Child,
    pgid: u32,
}

/// Owns at most one running child at a time.
///
/// Every operation takes the same async mutex and holds it until it is
/// done, so a `restart` requested while another restart is stopping or
/// spawning waits for that one to finish before it begins. An observer never
/// sees two live children or a half-finished transition.
#[derive(Debug)]
pub struct ProcessSupervisor {
    command: BuiltCommand,
    stop_timeout: Duration,
    slot: Mutex<Option<ProcessHandle>>,
}

impl ProcessSupervisor {
    pub fn new(command: BuiltCommand, stop_timeout: Duration) -> Self {
        Self {
            command,
            stop_timeout,
            slot: Mutex::new(None),
        }
    }

    pub fn command(&self) -> &BuiltCommand {
        &self.command
    }

    /// Spawn the command unless a live child already exists.
    ///
    /// Spawn failures are logged and leave the supervisor idle.
    pub async fn start(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.as_mut() {
            if matches!(handle.child.try_wait(), Ok(None)) {
                debug!(pid = handle.pgid, "start requested but process is already running");
                return;
            }
        }
        // Reap a self-terminated child (and any stragglers in its group).
        self.stop_locked(&mut slot).await;
        self.start_locked(&mut slot);
    }

    /// Terminate the whole process group and wait for the child to exit.
    ///
    /// Idempotent: stopping with nothing running is a no-op.
    pub async fn stop(&self) {
        let mut slot = self.slot.lock().await;
        self.stop_locked(&mut slot).await;
    }

    /// Stop, then start the same command again.
    pub async fn restart(&self) {
        let mut slot = self.slot.lock().await;
        info!(command = %self.command, "restarting process");
        self.stop_locked(&mut slot).await;
        self.start_locked(&mut slot);
    }

    /// Whether a child is currently alive.
    pub async fn is_running(&self) -> bool {
        let mut slot = self.slot.lock().await;
        match slot.as_mut() {
            Some(handle) => matches!(handle.child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Process-group id of the current child, if one was spawned.
    pub async fn pgid(&self) -> Option<u32> {
        self.slot.lock().await.as_ref().map(|h| h.pgid)
    }

    fn start_locked(&self, slot: &mut Option<ProcessHandle>) {
        let mut cmd = self.command.to_command();
        signal::configure_group(&mut cmd);

        match cmd.spawn() {
            Ok(child) => match child.id() {
                Some(pid) => {
                    info!(pid, command = %self.command, shell = self.command.use_shell, "process started");
                    *slot = Some(ProcessHandle { child, pgid: pid });
                }
                None => {
                    warn!(command = %self.command, "process exited before its pid could be read");
                    *slot = None;
                }
            },
            Err(source) => {
                let err = DevloopError::ProcessSpawn {
                    command: self.command.to_string(),
                    source,
                };
                error!(error = %err, "the app crashed, waiting for file changes to restart");
                *slot = None;
            }
        }
    }

    async fn stop_locked(&self, slot: &mut Option<ProcessHandle>) {
        let Some(mut handle) = slot.take() else {
            debug!("stop requested but nothing is running");
            return;
        };
        let pgid = handle.pgid;
        let deadline = self.stop_deadline();
        let leader_exited = matches!(handle.child.try_wait(), Ok(Some(_)));

        // Signal the group even when the leader is gone: children of a
        // `sh -c` line may still be alive in it.
        match signal::terminate_group(pgid) {
            Ok(()) => debug!(pgid, "sent termination signal to process group"),
            Err(DevloopError::ProcessTerminationRace(reason)) => {
                debug!(pgid, %reason, "process group already gone");
            }
            Err(err) => warn!(pgid, error = %err, "failed to signal process group"),
        }

        let mut killed = false;
        if leader_exited {
            debug!(pgid, "group leader had already exited");
        } else {
            match tokio::time::timeout_at(deadline, handle.child.wait()).await {
                Ok(Ok(status)) => info!(pgid, %status, "process stopped"),
                Ok(Err(err)) => warn!(pgid, error = %err, "failed waiting for process to exit"),
                Err(_) => {
                    self.force_kill(pgid);
                    killed = true;
                    if let Err(err) = handle.child.kill().await {
                        debug!(pgid, error = %err, "failed to kill group leader");
                    }
                }
            }
        }

        // The leader is reaped by now; wait for members that outlive it.
        self.wait_for_group(pgid, deadline, killed).await;
    }

    /// Poll until no member of the group is left, force-killing the group
    /// once `deadline` passes.
    async fn wait_for_group(&self, pgid: u32, deadline: Instant, killed: bool) {
        let mut kill_grace = killed.then(|| self.stop_deadline());
        while signal::group_alive(pgid) {
            let now = Instant::now();
            match kill_grace {
                None if now >= deadline => {
                    self.force_kill(pgid);
                    kill_grace = Some(self.stop_deadline());
                }
                Some(grace) if now >= grace => {
                    // Killed members stay listed until their new parent reaps them.
                    debug!(pgid, "process group still listed after SIGKILL");
                    return;
                }
                _ => {}
            }
            tokio::time::sleep(GROUP_POLL).await;
        }
    }

    fn force_kill(&self, pgid: u32) {
        warn!(
            pgid,
            timeout_ms = u64::try_from(self.stop_timeout.as_millis()).unwrap_or(u64::MAX),
            "process group ignored termination; killing it"
        );
        if let Err(err) = signal::kill_group(pgid) {
            debug!(pgid, error = %err, "force kill of process group failed");
        }
    }

    fn stop_deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.stop_timeout)
            .unwrap_or_else(|| now + Duration::from_secs(24 * 60 * 60))
    }
}
