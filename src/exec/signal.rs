// src/exec/signal.rs

//! Process-group plumbing: put a child in its own group at spawn time, and
//! signal the whole group later.

use tokio::process::Command;

use crate::errors::{DevloopError, Result};

/// Make the spawned child the leader of a fresh process group.
#[cfg(unix)]
pub fn configure_group(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(windows)]
pub fn configure_group(cmd: &mut Command) {
    use windows_sys::Win32::System::Threading::CREATE_NEW_PROCESS_GROUP;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

/// Ask every member of the group led by `pgid` to terminate (`SIGTERM`).
///
/// A group that no longer exists is reported as
/// [`DevloopError::ProcessTerminationRace`].
#[cfg(unix)]
pub fn terminate_group(pgid: u32) -> Result<()> {
    send_to_group(pgid, libc::SIGTERM)
}

/// Forcefully kill every member of the group (`SIGKILL`).
#[cfg(unix)]
pub fn kill_group(pgid: u32) -> Result<()> {
    send_to_group(pgid, libc::SIGKILL)
}

/// Whether any member of the group led by `pgid` still exists.
///
/// Uses signal 0, so nothing is delivered. `EPERM` still means the group
/// exists.
#[cfg(unix)]
pub fn group_alive(pgid: u32) -> bool {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return false;
    };
    // SAFETY: killpg has no memory-safety preconditions.
    let rc = unsafe { libc::killpg(pgid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(unix)]
fn send_to_group(pgid: u32, signal: libc::c_int) -> Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| DevloopError::ProcessTerminationRace(format!("invalid pgid {pgid}")))?;
    // SAFETY: killpg has no memory-safety preconditions.
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Err(DevloopError::ProcessTerminationRace(format!(
            "no process group {pgid}"
        )))
    } else {
        Err(DevloopError::Io(err))
    }
}

/// Send CTRL_BREAK to the console process group created at spawn time.
#[cfg(windows)]
pub fn terminate_group(pgid: u32) -> Result<()> {
    use windows_sys::Win32::System::Console::{GenerateConsoleCtrlEvent, CTRL_BREAK_EVENT};

    // SAFETY: plain FFI call taking two integers.
    let ok = unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pgid) };
    if ok != 0 {
        Ok(())
    } else {
        Err(DevloopError::ProcessTerminationRace(format!(
            "CTRL_BREAK to group {pgid} failed: {}",
            std::io::Error::last_os_error()
        )))
    }
}

/// Windows has no cheap group membership probe; `kill_group` walks the
/// tree instead.
#[cfg(windows)]
pub fn group_alive(_pgid: u32) -> bool {
    false
}

/// Kill the whole process tree rooted at `pgid`.
#[cfg(windows)]
pub fn kill_group(pgid: u32) -> Result<()> {
    let status = std::process::Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pgid.to_string()])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(DevloopError::ProcessTerminationRace(format!(
            "taskkill for {pgid} exited with {status}"
        )))
    }
}
