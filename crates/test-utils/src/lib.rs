//! Shared helpers for devloop's integration tests: tracing capture, a
//! timeout guard, config builders and fakes for the process and browser
//! seams.

pub mod builders;
pub mod fake_browser;
pub mod fake_process;

pub use fake_browser::{BrowserCall, FakeBrowser};
pub use fake_process::{FakeProcess, ProcessCall};

use std::future::Future;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Route devloop's events into the test harness's captured output.
///
/// Filters with `RUST_LOG`, defaulting to `devloop=debug`. Safe to call from
/// every test; only the first call installs the subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,devloop=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("step did not finish within {TEST_TIMEOUT:?}"),
    }
}
