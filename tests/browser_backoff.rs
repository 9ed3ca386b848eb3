// tests/browser_backoff.rs

mod common;
use crate::common::{BrowserCall, TestResult, fake_orchestrator, init_tracing};

use std::time::Duration;

use tokio::time::Instant;

use devloop::browser::BrowserError;
use devloop::engine::ReloadOrchestrator;

const BASE: Duration = Duration::from_millis(1000);

/// The single pending reload trigger.
fn pending(orchestrator: &ReloadOrchestrator) -> (Instant, Duration) {
    let pending = orchestrator.queue().pending();
    assert_eq!(pending.len(), 1, "expected exactly one pending reload: {pending:?}");
    pending[0]
}

fn assert_due_after(fire_at: Instant, from: Instant, delay: Duration) {
    let waited = fire_at.duration_since(from);
    assert!(
        waited >= delay && waited < delay + Duration::from_millis(500),
        "expected ~{delay:?}, got {waited:?}"
    );
}

#[tokio::test]
async fn retries_double_the_delay_until_a_refresh_succeeds() -> TestResult {
    init_tracing();
    let (orchestrator, _process, browser, _events) = fake_orchestrator(BASE);
    browser.fail_refreshes(2);

    let before = Instant::now();
    orchestrator.restart_and_reload().await;
    let (fire_at, delay) = pending(&orchestrator);
    assert_eq!(delay, BASE);
    assert_due_after(fire_at, before, BASE);

    // First failure: next attempt 2s after it.
    let failed_at = Instant::now();
    orchestrator.queue().drain_ready_at(fire_at).await?;
    let (fire_at, delay) = pending(&orchestrator);
    assert_eq!(delay, Duration::from_millis(2000));
    assert_due_after(fire_at, failed_at, Duration::from_millis(2000));

    // Second failure: 4s.
    let failed_at = Instant::now();
    orchestrator.queue().drain_ready_at(fire_at).await?;
    let (fire_at, delay) = pending(&orchestrator);
    assert_eq!(delay, Duration::from_millis(4000));
    assert_due_after(fire_at, failed_at, Duration::from_millis(4000));

    // Success: back to idle.
    orchestrator.queue().drain_ready_at(fire_at).await?;
    assert!(orchestrator.queue().is_empty());
    assert_eq!(browser.refresh_count(), 3);
    Ok(())
}

#[tokio::test]
async fn a_new_change_resets_the_sequence() -> TestResult {
    let (orchestrator, process, browser, _events) = fake_orchestrator(BASE);
    browser.fail_refreshes(3);

    orchestrator.restart_and_reload().await;
    let (fire_at, _) = pending(&orchestrator);
    orchestrator.queue().drain_ready_at(fire_at).await?;
    let (fire_at, _) = pending(&orchestrator);
    orchestrator.queue().drain_ready_at(fire_at).await?;
    assert_eq!(pending(&orchestrator).1, Duration::from_millis(4000));

    orchestrator.on_change("src/app.py".as_ref()).await;
    let (_, delay) = pending(&orchestrator);
    assert_eq!(delay, BASE);
    assert_eq!(process.count(crate::common::ProcessCall::Restart), 2);
    Ok(())
}

#[tokio::test]
async fn transient_failure_at_startup_schedules_the_first_reload() -> TestResult {
    let (orchestrator, _process, browser, _events) = fake_orchestrator(BASE);
    browser.push_navigate_result(Err(BrowserError::NavigationFailed(
        "Reached error page: about:neterror".to_string(),
    )));

    let before = Instant::now();
    orchestrator.start().await?;
    let (fire_at, delay) = pending(&orchestrator);
    assert_eq!(delay, BASE);
    assert_due_after(fire_at, before, BASE);
    assert_eq!(
        browser.calls(),
        vec![BrowserCall::Navigate(crate::common::URL.to_string())]
    );

    // The retry fails too: the next one is due twice the base delay later.
    browser.fail_refreshes(1);
    let failed_at = Instant::now();
    orchestrator.queue().drain_ready_at(fire_at).await?;
    let (fire_at, delay) = pending(&orchestrator);
    assert_eq!(delay, BASE * 2);
    assert_due_after(fire_at, failed_at, BASE * 2);

    orchestrator.queue().drain_ready_at(fire_at).await?;
    assert!(orchestrator.queue().is_empty());
    assert_eq!(browser.refresh_count(), 2);
    Ok(())
}

#[tokio::test]
async fn manual_browser_refresh_fires_immediately() -> TestResult {
    let (orchestrator, _process, browser, _events) = fake_orchestrator(BASE);

    orchestrator.refresh_browser();
    let (fire_at, delay) = pending(&orchestrator);
    assert!(fire_at <= Instant::now());
    assert_eq!(delay, BASE);

    orchestrator.queue().drain_ready_at(Instant::now()).await?;
    assert_eq!(browser.refresh_count(), 1);
    Ok(())
}

#[tokio::test]
async fn a_saturated_delay_stays_saturated() -> TestResult {
    let (orchestrator, _process, browser, _events) = fake_orchestrator(BASE);
    browser.fail_refreshes(1);
    let reload = orchestrator.reload().ok_or("no browser configured")?;

    let now = Instant::now();
    reload.schedule_at(now, Duration::MAX);
    orchestrator.queue().drain_ready_at(now).await?;

    let (fire_at, delay) = pending(&orchestrator);
    assert_eq!(delay, Duration::MAX);
    assert!(fire_at > now);
    Ok(())
}
