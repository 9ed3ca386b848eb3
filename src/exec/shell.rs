// src/exec/shell.rs

//! One-time detection of PowerShell on Windows hosts.

use std::sync::OnceLock;

use tracing::debug;

static POWERSHELL_PRESENT: OnceLock<bool> = OnceLock::new();

/// Whether a `powershell` executable is reachable on the PATH.
///
/// The probe runs once per process; later calls return the cached answer.
pub fn powershell_available() -> bool {
    *POWERSHELL_PRESENT.get_or_init(|| {
        let found = which::which("powershell").is_ok();
        debug!(found, "probed for powershell");
        found
    })
}
