//! Per-worker and per-task bookkeeping owned by the pool's control
//! loop. Single-threaded by construction, so nothing here is locked.

use std::time::Instant;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ComputeError;
use crate::protocol::TaskId;
use crate::worker::WorkerAdapter;

/// One worker slot. The slot id is stable across restarts; the epoch
/// increments on every (re)spawn.
pub(crate) struct WorkerSlot {
    pub id: usize,
    pub epoch: u64,
    pub adapter: Box<dyn WorkerAdapter>,
    pub current_task: Option<TaskId>,
    /// Affinity cache: `"module:functionName"` keys in insertion order,
    /// oldest first.
    pub cached_functions: IndexSet<String>,
    pub tasks_executed: u64,
    pub last_task_at: Option<DateTime<Utc>>,
}

impl WorkerSlot {
    pub fn new(id: usize, epoch: u64, adapter: Box<dyn WorkerAdapter>) -> Self {
        Self {
            id,
            epoch,
            adapter,
            current_task: None,
            cached_functions: IndexSet::new(),
            tasks_executed: 0,
            last_task_at: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_task.is_none()
    }

    /// Records an executed function in the affinity cache. When the
    /// cache would exceed `limit`, the oldest half is evicted in one
    /// sweep rather than one entry at a time.
    pub fn cache_function(&mut self, key: String, limit: usize) {
        if self.cached_functions.contains(&key) {
            return;
        }
        if limit == 0 {
            return;
        }
        if self.cached_functions.len() >= limit {
            let len = self.cached_functions.len();
            self.cached_functions = self.cached_functions.split_off(len / 2);
        }
        self.cached_functions.insert(key);
    }
}

/// A submitted task awaiting its result, whether running or queued.
pub(crate) struct ActiveTask {
    /// Affinity key the task was submitted under.
    pub key: Option<String>,
    /// Slot currently executing the task; `None` while queued.
    pub worker_id: Option<usize>,
    pub responder: oneshot::Sender<Result<Value, ComputeError>>,
    pub on_progress: Option<Box<dyn Fn(f64) + Send + Sync>>,
    /// Sleep task feeding the timeout channel; aborted on completion.
    pub timeout: Option<JoinHandle<()>>,
    pub timeout_ms: u64,
    pub last_progress: f64,
    pub started: Instant,
}

impl ActiveTask {
    /// Resolves the caller and cancels the pending timeout.
    pub fn finish(self, result: Result<Value, ComputeError>) {
        if let Some(timer) = self.timeout {
            timer.abort();
        }
        let _ = self.responder.send(result);
    }

    /// Forwards a progress report, dropping regressions so the caller
    /// only ever observes a non-decreasing sequence.
    pub fn report_progress(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction < self.last_progress {
            return;
        }
        self.last_progress = fraction;
        if let Some(callback) = &self.on_progress {
            callback(fraction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Task;

    struct NullAdapter;

    impl WorkerAdapter for NullAdapter {
        fn post(&self, _task: Task) -> Result<(), ComputeError> {
            Ok(())
        }
        fn terminate(&mut self) {}
    }

    fn slot() -> WorkerSlot {
        WorkerSlot::new(0, 1, Box::new(NullAdapter))
    }

    #[test]
    fn cache_overflow_evicts_oldest_half() {
        let mut slot = slot();
        for i in 0..4 {
            slot.cache_function(format!("stats:fn{i}"), 4);
        }
        assert_eq!(slot.cached_functions.len(), 4);

        slot.cache_function("stats:fn4".to_string(), 4);

        // fn0 and fn1 (the oldest half) are gone; insertion order of
        // the survivors is preserved.
        let kept: Vec<&str> = slot.cached_functions.iter().map(String::as_str).collect();
        assert_eq!(kept, ["stats:fn2", "stats:fn3", "stats:fn4"]);
    }

    #[test]
    fn cache_hit_does_not_evict() {
        let mut slot = slot();
        for i in 0..4 {
            slot.cache_function(format!("stats:fn{i}"), 4);
        }
        slot.cache_function("stats:fn0".to_string(), 4);
        assert_eq!(slot.cached_functions.len(), 4);
    }
}
