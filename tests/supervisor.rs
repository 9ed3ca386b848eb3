// tests/supervisor.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use std::path::{Path, PathBuf};
use std::time::Duration;

use devloop::config::ScriptConfig;
use devloop::errors::DevloopError;
use devloop::exec::signal::terminate_group;
use devloop::exec::{build_command, ProcessSupervisor};
use devloop::types::Platform;

fn supervisor(script: ScriptConfig, stop_timeout: Duration) -> ProcessSupervisor {
    let command = build_command(&script, Platform::Posix).unwrap();
    ProcessSupervisor::new(command, stop_timeout)
}

fn sleeper() -> ProcessSupervisor {
    supervisor(ScriptConfig::new("sleep 30"), Duration::from_secs(5))
}

#[tokio::test]
async fn stopping_twice_is_a_no_op() -> TestResult {
    init_tracing();
    let sup = sleeper();
    sup.start().await;
    assert!(sup.is_running().await);

    with_timeout(sup.stop()).await;
    with_timeout(sup.stop()).await;
    assert!(!sup.is_running().await);
    assert_eq!(sup.pgid().await, None);
    Ok(())
}

#[tokio::test]
async fn restart_replaces_the_process_group() -> TestResult {
    let sup = sleeper();
    sup.start().await;
    let first = sup.pgid().await.ok_or("no first pgid")?;

    with_timeout(sup.restart()).await;
    let second = sup.pgid().await.ok_or("no second pgid")?;

    assert_ne!(first, second);
    assert!(sup.is_running().await);
    assert!(matches!(
        terminate_group(first),
        Err(DevloopError::ProcessTerminationRace(_))
    ));

    sup.stop().await;
    Ok(())
}

#[tokio::test]
async fn start_keeps_a_live_process() -> TestResult {
    let sup = sleeper();
    sup.start().await;
    let pgid = sup.pgid().await;
    sup.start().await;
    assert_eq!(sup.pgid().await, pgid);
    sup.stop().await;
    Ok(())
}

#[tokio::test]
async fn spawn_failure_leaves_the_supervisor_idle() -> TestResult {
    let sup = supervisor(
        ScriptConfig::new("/nonexistent/devloop-missing-binary --flag"),
        Duration::from_secs(1),
    );
    sup.start().await;
    assert!(!sup.is_running().await);

    // A later restart simply tries again.
    sup.restart().await;
    assert!(!sup.is_running().await);
    sup.stop().await;
    Ok(())
}

#[tokio::test]
async fn a_process_ignoring_sigterm_is_killed_after_the_timeout() -> TestResult {
    let sup = supervisor(
        ScriptConfig::new("trap '' TERM; sleep 30").with_shell(true),
        Duration::from_millis(200),
    );
    sup.start().await;
    // Give the shell time to install the trap.
    tokio::time::sleep(Duration::from_millis(200)).await;

    with_timeout(sup.stop()).await;
    assert!(!sup.is_running().await);
    Ok(())
}

/// Shell line that forks a TERM-ignoring loop appending to
/// `<dir>/ticks-<leader pid>`, then runs `tail` in the foreground.
fn stubborn_member(dir: &Path, tail: &str) -> ScriptConfig {
    let line = format!(
        "(trap '' TERM; while true; do echo tick >> '{}'/ticks-$$; sleep 0.05; done) & {tail}",
        dir.display()
    );
    ScriptConfig::new(line.as_str()).with_shell(true)
}

async fn marker_of(sup: &ProcessSupervisor, dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let pgid = sup.pgid().await.ok_or("no pgid")?;
    let marker = dir.join(format!("ticks-{pgid}"));
    for _ in 0..40 {
        if marker.exists() {
            return Ok(marker);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    Err(format!("{} was never written", marker.display()).into())
}

/// Assert nothing keeps appending to `marker` once `stop()` returned.
async fn assert_marker_settles(marker: &Path) -> TestResult {
    tokio::time::sleep(Duration::from_millis(100)).await;
    let settled = std::fs::metadata(marker)?.len();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        std::fs::metadata(marker)?.len(),
        settled,
        "a member of the old process group kept running"
    );
    Ok(())
}

#[tokio::test]
async fn group_members_outliving_the_leader_are_killed() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let sup = supervisor(stubborn_member(dir.path(), "sleep 30"), Duration::from_millis(300));
    sup.start().await;
    let marker = marker_of(&sup, dir.path()).await?;

    with_timeout(sup.stop()).await;
    assert!(!sup.is_running().await);
    assert_marker_settles(&marker).await
}

#[tokio::test]
async fn members_left_behind_by_an_exited_leader_are_killed() -> TestResult {
    let dir = tempfile::tempdir()?;
    let sup = supervisor(stubborn_member(dir.path(), "exit 0"), Duration::from_millis(300));
    sup.start().await;
    let marker = marker_of(&sup, dir.path()).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!sup.is_running().await);

    with_timeout(sup.stop()).await;
    assert_marker_settles(&marker).await
}

#[tokio::test]
async fn restart_does_not_leave_old_members_running() -> TestResult {
    let dir = tempfile::tempdir()?;
    let sup = supervisor(stubborn_member(dir.path(), "sleep 30"), Duration::from_millis(300));
    sup.start().await;
    let first = marker_of(&sup, dir.path()).await?;

    with_timeout(sup.restart()).await;
    let second = marker_of(&sup, dir.path()).await?;
    assert_ne!(first, second);
    assert_marker_settles(&first).await?;

    with_timeout(sup.stop()).await;
    assert_marker_settles(&second).await
}

#[tokio::test]
async fn a_chained_script_leads_its_own_process_group() -> TestResult {
    let sup = supervisor(
        ScriptConfig::new(vec!["true", "sleep 30"]),
        Duration::from_secs(5),
    );
    assert!(sup.command().use_shell);

    sup.start().await;
    let pid = sup.pgid().await.ok_or("no pid")?;
    let pid = libc::pid_t::try_from(pid)?;
    // SAFETY: getpgid only reads kernel process state.
    let group = unsafe { libc::getpgid(pid) };
    assert_eq!(group, pid);
    // SAFETY: as above.
    assert_ne!(group, unsafe { libc::getpgid(0) });

    with_timeout(sup.stop()).await;
    assert!(!sup.is_running().await);
    Ok(())
}

#[tokio::test]
async fn a_self_terminated_script_can_be_started_again() -> TestResult {
    let sup = supervisor(ScriptConfig::new("true"), Duration::from_secs(1));
    sup.start().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!sup.is_running().await);

    sup.stop().await;
    sup.start().await;
    sup.stop().await;
    Ok(())
}

#[tokio::test]
async fn concurrent_restarts_leave_exactly_one_process() -> TestResult {
    let sup = std::sync::Arc::new(sleeper());
    sup.start().await;

    let a = tokio::spawn({
        let sup = std::sync::Arc::clone(&sup);
        async move { sup.restart().await }
    });
    let b = tokio::spawn({
        let sup = std::sync::Arc::clone(&sup);
        async move { sup.restart().await }
    });
    with_timeout(async {
        a.await.unwrap();
        b.await.unwrap();
    })
    .await;

    let pgid = sup.pgid().await.ok_or("no pgid")?;
    assert!(sup.is_running().await);
    sup.stop().await;
    assert!(matches!(
        terminate_group(pgid),
        Err(DevloopError::ProcessTerminationRace(_))
    ));
    Ok(())
}
