#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use devloop::engine::{BackoffPolicy, ControlEvent, ReloadOrchestrator};

pub use devloop_test_utils::builders::ConfigFileBuilder;
pub use devloop_test_utils::{init_tracing, with_timeout, BrowserCall, FakeBrowser, FakeProcess, ProcessCall};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub const URL: &str = "http://localhost:5000";

/// An orchestrator over fakes, with the receiving end of its control
/// channel.
pub fn fake_orchestrator(
    base_delay: Duration,
) -> (
    ReloadOrchestrator,
    FakeProcess,
    FakeBrowser,
    mpsc::UnboundedReceiver<ControlEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let process = FakeProcess::new();
    let browser = FakeBrowser::new();
    let orchestrator = ReloadOrchestrator::new(Arc::new(process.clone()), tx).with_browser(
        Arc::new(browser.clone()),
        URL,
        BackoffPolicy::new(base_delay),
    );
    (orchestrator, process, browser, rx)
}

pub fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}
