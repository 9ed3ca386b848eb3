use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use devloop::browser::{BrowserDriver, BrowserError};
use devloop::types::BoxFuture;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCall {
    Navigate(String),
    Refresh,
    Quit,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<(Instant, BrowserCall)>,
    navigate_results: VecDeque<Result<(), BrowserError>>,
    refresh_results: VecDeque<Result<(), BrowserError>>,
}

/// A browser driver with scripted results.
///
/// Each `navigate`/`refresh` pops the next scripted result for that
/// operation; once the script runs out every call succeeds.
#[derive(Debug, Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<State>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_navigate_result(&self, result: Result<(), BrowserError>) -> &Self {
        self.state.lock().unwrap().navigate_results.push_back(result);
        self
    }

    pub fn push_refresh_result(&self, result: Result<(), BrowserError>) -> &Self {
        self.state.lock().unwrap().refresh_results.push_back(result);
        self
    }

    /// Script `n` consecutive refresh failures that are worth retrying.
    pub fn fail_refreshes(&self, n: usize) -> &Self {
        for _ in 0..n {
            self.push_refresh_result(Err(BrowserError::NavigationFailed(
                "net::ERR_CONNECTION_REFUSED".to_string(),
            )));
        }
        self
    }

    pub fn calls(&self) -> Vec<BrowserCall> {
        self.state.lock().unwrap().calls.iter().map(|(_, c)| c.clone()).collect()
    }

    /// When each refresh happened.
    pub fn refresh_times(&self) -> Vec<Instant> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(_, c)| *c == BrowserCall::Refresh)
            .map(|(t, _)| *t)
            .collect()
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_times().len()
    }

    fn record(&self, call: BrowserCall) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        let result = match &call {
            BrowserCall::Navigate(_) => state.navigate_results.pop_front(),
            BrowserCall::Refresh => state.refresh_results.pop_front(),
            BrowserCall::Quit => None,
        };
        state.calls.push((Instant::now(), call));
        result.unwrap_or(Ok(()))
    }
}

impl BrowserDriver for FakeBrowser {
    fn navigate(&self, url: &str) -> BoxFuture<'_, Result<(), BrowserError>> {
        let call = BrowserCall::Navigate(url.to_string());
        Box::pin(async move { self.record(call) })
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), BrowserError>> {
        Box::pin(async move { self.record(BrowserCall::Refresh) })
    }

    fn quit(&self) -> BoxFuture<'_, Result<(), BrowserError>> {
        Box::pin(async move { self.record(BrowserCall::Quit) })
    }
}
