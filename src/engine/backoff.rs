// src/engine/backoff.rs

use std::time::Duration;

/// Doubling retry delay for browser reloads.
///
/// The first attempt waits `base`; every failure doubles the previous
/// delay. Without a cap the growth is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Option<Duration>,
}

impl BackoffPolicy {
    pub fn new(base: Duration) -> Self {
        Self { base, cap: None }
    }

    pub fn with_cap(mut self, cap: Option<Duration>) -> Self {
        self.cap = cap;
        self
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn cap(&self) -> Option<Duration> {
        self.cap
    }

    /// Delay of the first attempt after a change.
    pub fn initial(&self) -> Duration {
        self.clamp(self.base)
    }

    /// Delay following a failed attempt that waited `previous`.
    pub fn next(&self, previous: Duration) -> Duration {
        self.clamp(previous.checked_mul(2).unwrap_or(Duration::MAX))
    }

    /// Delay of the `n`th retry (1-based): `base * 2^(n-1)`.
    pub fn nth_retry(&self, n: u32) -> Duration {
        (1..n).fold(self.initial(), |delay, _| self.next(delay))
    }

    fn clamp(&self, delay: Duration) -> Duration {
        match self.cap {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}
