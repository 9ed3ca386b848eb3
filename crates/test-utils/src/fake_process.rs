use std::sync::{Arc, Mutex};

use devloop::exec::ProcessBackend;
use devloop::types::BoxFuture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessCall {
    Start,
    Stop,
    Restart,
}

/// A process backend that spawns nothing and records every call.
#[derive(Debug, Clone, Default)]
pub struct FakeProcess {
    calls: Arc<Mutex<Vec<ProcessCall>>>,
    running: Arc<Mutex<bool>>,
}

impl FakeProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ProcessCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: ProcessCall) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    fn record(&self, call: ProcessCall, running: bool) {
        self.calls.lock().unwrap().push(call);
        *self.running.lock().unwrap() = running;
    }
}

impl ProcessBackend for FakeProcess {
    fn start(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.record(ProcessCall::Start, true) })
    }

    fn stop(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.record(ProcessCall::Stop, false) })
    }

    fn restart(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.record(ProcessCall::Restart, true) })
    }
}
