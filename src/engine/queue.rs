// src/engine/queue.rs

//! Deferred, single-fire actions with per-trigger error handlers.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::errors::{DevloopError, Result};
use crate::types::BoxFuture;

/// Work run when a trigger fires.
pub type TriggerAction<T> = Arc<dyn Fn(&Trigger<T>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Receives the trigger whose action failed, together with the error.
pub type ErrorHandler<T> = Arc<dyn Fn(&Trigger<T>, DevloopError) + Send + Sync>;

/// Box an async closure into a [`TriggerAction`].
pub fn action<T, F, Fut>(f: F) -> TriggerAction<T>
where
    F: Fn(&Trigger<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |trigger: &Trigger<T>| -> BoxFuture<'static, Result<()>> { Box::pin(f(trigger)) })
}

pub fn error_handler<T, F>(f: F) -> ErrorHandler<T>
where
    F: Fn(&Trigger<T>, DevloopError) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One scheduled action.
///
/// Immutable once built; a retry is a new trigger created with
/// [`Trigger::retry`].
pub struct Trigger<T> {
    action: TriggerAction<T>,
    fire_at: Instant,
    on_error: Option<ErrorHandler<T>>,
    payload: T,
    epoch: u64,
}

impl<T: fmt::Debug> fmt::Debug for Trigger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("fire_at", &self.fire_at)
            .field("payload", &self.payload)
            .field("has_error_handler", &self.on_error.is_some())
            .finish()
    }
}

impl<T> Trigger<T> {
    pub fn new(fire_at: Instant, payload: T, action: TriggerAction<T>) -> Self {
        Self {
            action,
            fire_at,
            on_error: None,
            payload,
            epoch: 0,
        }
    }

    pub fn with_error_handler(mut self, handler: ErrorHandler<T>) -> Self {
        self.on_error = Some(handler);
        self
    }

    pub fn fire_at(&self) -> Instant {
        self.fire_at
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        self.fire_at <= now
    }

    /// Same action and error handler, new fire time and payload.
    pub fn retry(&self, fire_at: Instant, payload: T) -> Self {
        Self {
            action: Arc::clone(&self.action),
            fire_at,
            on_error: self.on_error.clone(),
            payload,
            epoch: self.epoch,
        }
    }
}

#[derive(Debug)]
struct QueueState<T> {
    triggers: Vec<Trigger<T>>,
    /// Bumped by every `cancel_all`.
    epoch: u64,
}

/// Insertion-ordered set of live triggers.
///
/// The lock is held only to append, partition, or clear the list; actions
/// always run after it is released, so an action or error handler may
/// schedule new triggers.
pub struct TriggerQueue<T> {
    state: Mutex<QueueState<T>>,
}

impl<T: fmt::Debug> fmt::Debug for TriggerQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("TriggerQueue")
            .field("triggers", &state.triggers)
            .field("epoch", &state.epoch)
            .finish()
    }
}

impl<T> Default for TriggerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TriggerQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                triggers: Vec::new(),
                epoch: 0,
            }),
        }
    }

    // The list stays consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn schedule(&self, mut trigger: Trigger<T>) {
        let mut state = self.lock();
        trigger.epoch = state.epoch;
        trace!(pending = state.triggers.len() + 1, "trigger scheduled");
        state.triggers.push(trigger);
    }

    /// Schedule `retry` on behalf of `origin`, unless a `cancel_all` has
    /// happened since `origin` was scheduled. Returns whether it was queued.
    pub fn reschedule(&self, origin: &Trigger<T>, retry: Trigger<T>) -> bool {
        let mut state = self.lock();
        if origin.epoch != state.epoch {
            debug!("dropping retry of a cancelled trigger");
            return false;
        }
        let mut retry = retry;
        retry.epoch = state.epoch;
        state.triggers.push(retry);
        true
    }

    /// Drop every pending trigger. Returns how many were dropped.
    pub fn cancel_all(&self) -> usize {
        let mut state = self.lock();
        state.epoch += 1;
        let dropped = state.triggers.len();
        state.triggers.clear();
        if dropped > 0 {
            debug!(dropped, "cancelled pending triggers");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fire time and payload of every pending trigger, in queue order.
    pub fn pending(&self) -> Vec<(Instant, T)>
    where
        T: Clone,
    {
        self.lock()
            .triggers
            .iter()
            .map(|t| (t.fire_at, t.payload.clone()))
            .collect()
    }

    pub async fn drain_ready(&self) -> Result<usize> {
        self.drain_ready_at(Instant::now()).await
    }

    /// Run every trigger due at `now`, oldest first.
    ///
    /// A failed action goes to its trigger's error handler. A failure with
    /// no handler stops the drain and is returned; remaining ready triggers
    /// of this pass are dropped.
    pub async fn drain_ready_at(&self, now: Instant) -> Result<usize> {
        let ready = {
            let mut state = self.lock();
            let (ready, pending): (Vec<_>, Vec<_>) =
                state.triggers.drain(..).partition(|t| t.is_ready(now));
            state.triggers = pending;
            ready
        };

        let fired = ready.len();
        for trigger in ready {
            if let Err(err) = (trigger.action)(&trigger).await {
                match &trigger.on_error {
                    Some(handler) => handler(&trigger, err),
                    None => return Err(err),
                }
            }
        }
        Ok(fired)
    }
}
