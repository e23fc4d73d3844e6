//! Validation request queueing and debounce timers.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::schema::ValidateOverrides;

/// Why a validation request was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A value edit; debounced per path-set key.
    Change,
    /// Focus left the widget.
    Blur,
    /// An explicit request, e.g. submit or a schema swap.
    Explicit,
}

/// A queued demand for path-scoped validation.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub paths: Vec<String>,
    pub trigger: Trigger,
    /// Options from the originating widget, layered over the ambient ones.
    pub overrides: ValidateOverrides,
}

impl ValidationRequest {
    pub fn new(paths: Vec<String>, trigger: Trigger) -> Self {
        Self {
            paths,
            trigger,
            overrides: ValidateOverrides::default(),
        }
    }
}

/// FIFO queue of requests awaiting dispatch.
///
/// Duplicates are intentionally preserved: each request carries its own
/// originating trigger and overrides.
#[derive(Debug, Default)]
pub struct PendingQueue {
    requests: Mutex<Vec<ValidationRequest>>,
}

impl PendingQueue {
    pub fn enqueue(&self, request: ValidationRequest) {
        self.requests.lock().push(request);
    }

    /// Drains every pending request in FIFO order.
    pub fn drain(&self) -> Vec<ValidationRequest> {
        std::mem::take(&mut *self.requests.lock())
    }

    /// The union of paths still waiting for dispatch.
    pub fn pending_paths(&self) -> Vec<String> {
        let requests = self.requests.lock();
        let mut paths = Vec::new();
        for request in requests.iter() {
            for path in &request.paths {
                if !paths.contains(path) {
                    paths.push(path.clone());
                }
            }
        }
        paths
    }
}

/// Registry of pending debounce timers, keyed by the joined path set.
///
/// Arming a key supersedes (aborts) any timer already pending for it;
/// teardown aborts everything.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TimerRegistry {
    pub fn arm(&self, key: String, handle: JoinHandle<()>) {
        let mut timers = self.timers.lock();
        timers.retain(|_, pending| !pending.is_finished());
        if let Some(superseded) = timers.insert(key, handle) {
            superseded.abort();
        }
    }

    pub fn cancel_all(&self) {
        for (_, handle) in self.timers.lock().drain() {
            handle.abort();
        }
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
