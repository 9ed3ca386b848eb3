// src/engine/orchestrator.rs

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::browser::BrowserDriver;
use crate::engine::backoff::BackoffPolicy;
use crate::engine::input::ManualCommand;
use crate::engine::reload::{BrowserReload, ReloadQueue};
use crate::engine::{ControlEvent, SessionEnd};
use crate::errors::Result;
use crate::exec::ProcessBackend;

/// Owns one session's process, browser reload, and trigger queue.
///
/// A configuration reload never mutates an orchestrator; the caller builds
/// a new one instead.
pub struct ReloadOrchestrator {
    process: Arc<dyn ProcessBackend>,
    reload: Option<BrowserReload>,
    queue: Arc<ReloadQueue>,
    events: mpsc::UnboundedSender<ControlEvent>,
    finished: watch::Sender<bool>,
}

impl fmt::Debug for ReloadOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadOrchestrator")
            .field("reload", &self.reload)
            .field("pending_triggers", &self.queue.len())
            .field("finished", &*self.finished.borrow())
            .finish_non_exhaustive()
    }
}

impl ReloadOrchestrator {
    /// `events` is where escalated trigger failures are reported; pass the
    /// sender half of the session's control channel.
    pub fn new(process: Arc<dyn ProcessBackend>, events: mpsc::UnboundedSender<ControlEvent>) -> Self {
        let (finished, _) = watch::channel(false);
        Self {
            process,
            reload: None,
            queue: Arc::new(ReloadQueue::new()),
            events,
            finished,
        }
    }

    /// Reload `url` in `browser` after every restart.
    pub fn with_browser(
        mut self,
        browser: Arc<dyn BrowserDriver>,
        url: impl Into<String>,
        policy: BackoffPolicy,
    ) -> Self {
        self.reload = Some(BrowserReload::new(
            browser,
            url,
            Arc::clone(&self.queue),
            policy,
            self.events.clone(),
        ));
        self
    }

    pub fn queue(&self) -> &Arc<ReloadQueue> {
        &self.queue
    }

    pub fn reload(&self) -> Option<&BrowserReload> {
        self.reload.as_ref()
    }

    pub fn events(&self) -> mpsc::UnboundedSender<ControlEvent> {
        self.events.clone()
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.borrow()
    }

    /// Flips to `true` once [`shutdown`](Self::shutdown) starts.
    pub fn finished_signal(&self) -> watch::Receiver<bool> {
        self.finished.subscribe()
    }

    /// Start the process, then open the browser.
    pub async fn start(&self) -> Result<()> {
        self.process.start().await;
        if let Some(reload) = &self.reload {
            reload.open().await?;
        }
        Ok(())
    }

    /// A debounced change was detected.
    pub async fn on_change(&self, path: &Path) {
        info!(?path, "detected changes in the project, reloading");
        self.restart_and_reload().await;
    }

    /// Drop any in-flight retries, restart, and queue a fresh reload.
    pub async fn restart_and_reload(&self) {
        if self.is_finished() {
            return;
        }
        self.queue.cancel_all();
        self.process.restart().await;
        if let Some(reload) = &self.reload {
            reload.schedule_after(reload.policy().initial());
        }
    }

    /// Reload the browser now, with the usual retries on failure.
    pub fn refresh_browser(&self) {
        match &self.reload {
            Some(reload) => {
                self.queue.cancel_all();
                reload.schedule_at(Instant::now(), reload.policy().initial());
            }
            None => info!("no browser URL is configured, can't refresh browser window"),
        }
    }

    /// Apply one manual command. Returns how the session ends, if it does.
    pub async fn handle_command(&self, command: ManualCommand) -> Option<SessionEnd> {
        debug!(%command, "manual command");
        match command {
            ManualCommand::Exit => {
                info!("stopping");
                Some(SessionEnd::Stopped)
            }
            ManualCommand::Restart => {
                info!("restarting the process");
                self.restart_and_reload().await;
                None
            }
            ManualCommand::RefreshBrowser => {
                info!("reloading browser window");
                self.refresh_browser();
                None
            }
            ManualCommand::ReloadConfig => {
                info!("reloading configuration, stopping the process and browser");
                Some(SessionEnd::ReloadConfig)
            }
            ManualCommand::Unknown(input) => {
                warn!(%input, "unknown command; {}", ManualCommand::help(self.reload.is_some()));
                None
            }
        }
    }

    /// Run due triggers. Does nothing once the session is finished.
    pub async fn drain_ready(&self) -> Result<usize> {
        if self.is_finished() {
            return Ok(0);
        }
        self.queue.drain_ready().await
    }

    /// Stop everything. Safe to call more than once.
    pub async fn shutdown(&self) {
        let already = self.finished.send_replace(true);
        self.queue.cancel_all();
        if already {
            return;
        }
        self.process.stop().await;
        if let Some(reload) = &self.reload {
            if let Err(err) = reload.browser().quit().await {
                error!(error = %err, "failed to close the browser");
            }
        }
        info!("session stopped");
    }
}
