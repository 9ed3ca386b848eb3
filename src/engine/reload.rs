// src/engine/reload.rs

//! Browser reload with doubling retries.
//!
//! States: idle (no reload trigger queued), scheduled (one queued), firing
//! (its action is running). A successful refresh goes back to idle. A
//! transient failure queues a retry with the doubled delay. Any other
//! failure ends the session through [`ControlEvent::Fatal`].

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::browser::{BrowserDriver, BrowserError};
use crate::engine::backoff::BackoffPolicy;
use crate::engine::queue::{action, error_handler, Trigger, TriggerQueue};
use crate::engine::ControlEvent;
use crate::errors::{DevloopError, Result};

/// Queue of browser reload triggers; the payload is the delay the trigger
/// waited.
pub type ReloadQueue = TriggerQueue<Duration>;

// Far enough that it never fires during a session.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// `now + delay`, saturating for absurd delays.
pub fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Builds and queues reload triggers for one browser and URL.
#[derive(Clone)]
pub struct BrowserReload {
    browser: Arc<dyn BrowserDriver>,
    url: String,
    queue: Arc<ReloadQueue>,
    policy: BackoffPolicy,
    events: mpsc::UnboundedSender<ControlEvent>,
}

impl std::fmt::Debug for BrowserReload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserReload")
            .field("url", &self.url)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BrowserReload {
    pub fn new(
        browser: Arc<dyn BrowserDriver>,
        url: impl Into<String>,
        queue: Arc<ReloadQueue>,
        policy: BackoffPolicy,
        events: mpsc::UnboundedSender<ControlEvent>,
    ) -> Self {
        Self {
            browser,
            url: url.into(),
            queue,
            policy,
            events,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn browser(&self) -> &Arc<dyn BrowserDriver> {
        &self.browser
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }

    /// Open the URL for the first time.
    ///
    /// A page that is not reachable yet queues the first reload at the base
    /// delay. Other failures are returned.
    pub async fn open(&self) -> Result<()> {
        match self.browser.navigate(&self.url).await {
            Ok(()) => {
                info!(url = %self.url, "browser opened");
                Ok(())
            }
            Err(err) if err.is_transient() => {
                let delay = self.policy.initial();
                warn!(
                    error = %err,
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "browser startup failed, retrying"
                );
                self.schedule_after(delay);
                Ok(())
            }
            Err(err) => {
                if let BrowserError::BinaryNotFound(_) = err {
                    error!("browser binary not found; install it or configure another browser");
                }
                Err(err.into())
            }
        }
    }

    /// Queue a reload `delay` from now, carrying `delay` as its payload.
    pub fn schedule_after(&self, delay: Duration) {
        self.schedule_at(deadline_after(Instant::now(), delay), delay);
    }

    pub fn schedule_at(&self, fire_at: Instant, delay: Duration) {
        self.queue.schedule(self.trigger(fire_at, delay));
    }

    /// A reload trigger firing at `fire_at`.
    pub fn trigger(&self, fire_at: Instant, delay: Duration) -> Trigger<Duration> {
        let browser = Arc::clone(&self.browser);
        let refresh = action(move |_: &Trigger<Duration>| {
            let browser = Arc::clone(&browser);
            async move { browser.refresh().await.map_err(DevloopError::from) }
        });

        let queue = Arc::downgrade(&self.queue);
        let policy = self.policy;
        let events = self.events.clone();
        let on_error = error_handler(move |failed: &Trigger<Duration>, err| {
            retry_or_escalate(&queue, policy, &events, failed, err);
        });

        Trigger::new(fire_at, delay, refresh).with_error_handler(on_error)
    }
}

fn retry_or_escalate(
    queue: &Weak<ReloadQueue>,
    policy: BackoffPolicy,
    events: &mpsc::UnboundedSender<ControlEvent>,
    failed: &Trigger<Duration>,
    err: DevloopError,
) {
    match err {
        DevloopError::Browser(browser_err) if browser_err.is_transient() => {
            let delay = policy.next(*failed.payload());
            warn!(
                error = %browser_err,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "browser reload didn't work, retrying"
            );
            if let Some(queue) = queue.upgrade() {
                let retry = failed.retry(deadline_after(Instant::now(), delay), delay);
                queue.reschedule(failed, retry);
            }
        }
        other => {
            error!(error = %other, "browser reload failed; stopping");
            // A closed channel means the session is already shutting down.
            let _ = events.send(ControlEvent::Fatal(other));
        }
    }
}
