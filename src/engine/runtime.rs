// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::input::ManualCommand;
use super::orchestrator::ReloadOrchestrator;
use super::{ControlEvent, SessionEnd};

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Period of the trigger drain loop.
    pub trigger_tick: Duration,
    /// Turn Ctrl-C into a normal stop.
    pub handle_ctrl_c: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            trigger_tick: Duration::from_millis(100),
            handle_ctrl_c: false,
        }
    }
}

/// Async shell around one [`ReloadOrchestrator`].
///
/// Runs the trigger drain loop on its own task and handles control events
/// (changes, manual commands, fatal errors) on the calling task, so process
/// restarts and browser calls never run inside the watcher callback.
pub struct Session {
    orchestrator: Arc<ReloadOrchestrator>,
    events: mpsc::UnboundedReceiver<ControlEvent>,
    options: SessionOptions,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("orchestrator", &self.orchestrator)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(
        orchestrator: Arc<ReloadOrchestrator>,
        events: mpsc::UnboundedReceiver<ControlEvent>,
        options: SessionOptions,
    ) -> Self {
        Self {
            orchestrator,
            events,
            options,
        }
    }

    pub fn orchestrator(&self) -> &Arc<ReloadOrchestrator> {
        &self.orchestrator
    }

    /// Start the orchestrator and run until the session ends.
    ///
    /// `lines` are raw input lines parsed as manual commands; it is
    /// borrowed so the same reader can serve the next session.
    pub async fn run(mut self, lines: Option<&mut mpsc::UnboundedReceiver<String>>) -> SessionEnd {
        info!("session started");
        let orchestrator = Arc::clone(&self.orchestrator);

        let mut tasks = vec![spawn_drain_loop(
            Arc::clone(&orchestrator),
            self.options.trigger_tick,
        )];
        if self.options.handle_ctrl_c {
            tasks.push(spawn_ctrl_c_listener(
                orchestrator.events(),
                orchestrator.finished_signal(),
            ));
        }

        let end = match orchestrator.start().await {
            Ok(()) => self.control_loop(lines).await,
            Err(err) => SessionEnd::Failed(err),
        };

        orchestrator.shutdown().await;
        for task in tasks {
            task.abort();
        }
        debug!(?end, "session ended");
        end
    }

    async fn control_loop(&mut self, mut lines: Option<&mut mpsc::UnboundedReceiver<String>>) -> SessionEnd {
        let mut input_open = lines.is_some();
        loop {
            let event = tokio::select! {
                event = self.events.recv() => event,
                line = next_line(&mut lines), if input_open => match line {
                    Some(line) => match ManualCommand::parse(&line) {
                        Some(command) => Some(ControlEvent::Command(command)),
                        None => continue,
                    },
                    None => {
                        debug!("input closed; manual commands disabled");
                        input_open = false;
                        continue;
                    }
                },
            };

            let Some(event) = event else {
                return SessionEnd::Stopped;
            };
            if let Some(end) = self.handle_event(event).await {
                return end;
            }
        }
    }

    async fn handle_event(&self, event: ControlEvent) -> Option<SessionEnd> {
        match event {
            ControlEvent::Changed(path) => {
                self.orchestrator.on_change(&path).await;
                None
            }
            ControlEvent::Command(command) => self.orchestrator.handle_command(command).await,
            ControlEvent::Fatal(err) => {
                error!(error = %err, "unrecoverable error");
                Some(SessionEnd::Failed(err))
            }
            ControlEvent::Interrupted => {
                info!("interrupted");
                Some(SessionEnd::Stopped)
            }
        }
    }
}

async fn next_line(lines: &mut Option<&mut mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match lines {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

fn spawn_drain_loop(orchestrator: Arc<ReloadOrchestrator>, tick: Duration) -> JoinHandle<()> {
    let mut finished = orchestrator.finished_signal();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = finished.changed() => {}
            }
            if *finished.borrow() {
                break;
            }
            if let Err(err) = orchestrator.drain_ready().await {
                // The session is going down; nothing else may fire.
                let _ = orchestrator.events().send(ControlEvent::Fatal(err));
                break;
            }
        }
        debug!("trigger drain loop finished");
    })
}

fn spawn_ctrl_c_listener(
    events: mpsc::UnboundedSender<ControlEvent>,
    mut finished: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => {
                    let _ = events.send(ControlEvent::Interrupted);
                }
                Err(err) => error!(error = %err, "failed to listen for Ctrl-C"),
            },
            _ = finished.changed() => {}
        }
    })
}
