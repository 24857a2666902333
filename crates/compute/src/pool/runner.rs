//! The pool control loop. Owns every slot and task record; reached
//! only through the command channel, so no state is shared or locked.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ComputeError;
use crate::protocol::{Envelope, Task, TaskId, TaskSpec, WorkerEvent, WorkerReply};
use crate::worker::WorkerFactory;

use super::state::{ActiveTask, WorkerSlot};
use super::{AffinityStats, AffinityStatus, ExecOptions, PoolConfig, PoolStatus, WorkerCacheInfo};

const DRAIN_POLL: Duration = Duration::from_millis(100);
const DRAIN_BOUND: Duration = Duration::from_secs(5);

pub(crate) enum Command {
    Execute {
        spec: TaskSpec,
        opts: ExecOptions,
        responder: oneshot::Sender<Result<Value, ComputeError>>,
    },
    Status {
        responder: oneshot::Sender<PoolStatus>,
    },
    AffinityStats {
        responder: oneshot::Sender<AffinityStats>,
    },
    Terminate {
        force: bool,
        responder: oneshot::Sender<()>,
    },
}

pub(crate) struct PoolRunner {
    config: PoolConfig,
    factory: Arc<dyn WorkerFactory>,
    slots: Vec<WorkerSlot>,
    /// Sink handed to every spawned worker; kept for respawns.
    worker_tx: mpsc::UnboundedSender<Envelope>,
    worker_rx: mpsc::UnboundedReceiver<Envelope>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    timer_tx: mpsc::UnboundedSender<TaskId>,
    timer_rx: mpsc::UnboundedReceiver<TaskId>,
    /// Every submitted, unresolved task, queued ones included.
    active: HashMap<TaskId, ActiveTask>,
    /// Tasks waiting for an idle worker, FIFO.
    queue: VecDeque<Task>,
    next_id: u64,
    affinity_hits: u64,
    affinity_misses: u64,
}

impl PoolRunner {
    pub fn new(
        config: PoolConfig,
        factory: Arc<dyn WorkerFactory>,
        slots: Vec<WorkerSlot>,
        worker_tx: mpsc::UnboundedSender<Envelope>,
        worker_rx: mpsc::UnboundedReceiver<Envelope>,
        cmd_rx: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            config,
            factory,
            slots,
            worker_tx,
            worker_rx,
            cmd_rx,
            timer_tx,
            timer_rx,
            active: HashMap::new(),
            queue: VecDeque::new(),
            next_id: 0,
            affinity_hits: 0,
            affinity_misses: 0,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Execute { spec, opts, responder }) => {
                        self.handle_execute(spec, opts, responder);
                    }
                    Some(Command::Status { responder }) => {
                        let _ = responder.send(self.status());
                    }
                    Some(Command::AffinityStats { responder }) => {
                        let _ = responder.send(self.affinity_stats());
                    }
                    Some(Command::Terminate { force, responder }) => {
                        if !force {
                            self.drain().await;
                        }
                        self.shutdown();
                        let _ = responder.send(());
                        return;
                    }
                    // Every handle dropped.
                    None => {
                        self.shutdown();
                        return;
                    }
                },
                Some(envelope) = self.worker_rx.recv() => self.handle_envelope(envelope),
                Some(id) = self.timer_rx.recv() => self.handle_timeout(id),
            }
        }
    }

    // ── Submission & dispatch ───────────────────────────────────────

    fn handle_execute(
        &mut self,
        spec: TaskSpec,
        opts: ExecOptions,
        responder: oneshot::Sender<Result<Value, ComputeError>>,
    ) {
        if spec.module.is_empty() || spec.function_name.is_empty() {
            let _ = responder.send(Err(ComputeError::InvalidTask));
            return;
        }

        self.next_id += 1;
        let id = TaskId(self.next_id);
        let key = spec.affinity_key();
        let task = spec.with_id(id);

        let timeout_ms = opts
            .timeout
            .map(|d| d.as_millis() as u64)
            .unwrap_or(self.config.task_timeout_ms);
        let timer = self.spawn_timeout(id, timeout_ms);

        self.active.insert(
            id,
            ActiveTask {
                key,
                worker_id: None,
                responder,
                on_progress: opts.on_progress,
                timeout: Some(timer),
                timeout_ms,
                last_progress: 0.0,
                started: Instant::now(),
            },
        );
        self.assign(task);
    }

    fn spawn_timeout(&self, id: TaskId, timeout_ms: u64) -> JoinHandle<()> {
        let timer_tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
            let _ = timer_tx.send(id);
        })
    }

    fn assign(&mut self, task: Task) {
        let key = self.active.get(&task.id).and_then(|t| t.key.clone());
        match self.select_worker(key.as_deref()) {
            Some(worker_id) => self.dispatch(worker_id, task),
            None => self.queue.push_back(task),
        }
    }

    /// Affinity-aware selection: idle worker with the function cached,
    /// else the least-loaded idle worker.
    fn select_worker(&mut self, key: Option<&str>) -> Option<usize> {
        if self.config.enable_affinity {
            if let Some(key) = key {
                if let Some(slot) = self
                    .slots
                    .iter()
                    .find(|s| s.is_idle() && s.cached_functions.contains(key))
                {
                    self.affinity_hits += 1;
                    debug!(worker_id = slot.id, key, "affinity hit");
                    return Some(slot.id);
                }
            }
        }

        let chosen = self
            .slots
            .iter()
            .filter(|s| s.is_idle())
            .min_by_key(|s| s.tasks_executed)
            .map(|s| s.id);
        if chosen.is_some() && self.config.enable_affinity && key.is_some() {
            self.affinity_misses += 1;
        }
        chosen
    }

    fn dispatch(&mut self, worker_id: usize, task: Task) {
        let id = task.id;
        self.slots[worker_id].current_task = Some(id);
        if let Some(active) = self.active.get_mut(&id) {
            active.worker_id = Some(worker_id);
        }
        debug!(task_id = %id, worker_id, "task dispatched");

        if let Err(e) = self.slots[worker_id].adapter.post(task) {
            warn!(task_id = %id, worker_id, error = %e, "failed to post task");
            if let Some(active) = self.active.remove(&id) {
                active.finish(Err(e));
            }
            self.restart_worker(worker_id);
        }
    }

    /// Hands queued tasks to idle workers in submission order.
    fn drain_queue(&mut self) {
        while self.slots.iter().any(WorkerSlot::is_idle) {
            let Some(task) = self.queue.pop_front() else {
                break;
            };
            self.assign(task);
        }
    }

    // ── Worker events ───────────────────────────────────────────────

    fn handle_envelope(&mut self, envelope: Envelope) {
        let Some(slot) = self.slots.get(envelope.worker_id) else {
            return;
        };
        if envelope.epoch != slot.epoch {
            debug!(
                worker_id = envelope.worker_id,
                epoch = envelope.epoch,
                "dropping stale worker message"
            );
            return;
        }

        match envelope.event {
            WorkerEvent::Reply(WorkerReply::Progress { id, progress }) => {
                if let Some(task) = self.active.get_mut(&id) {
                    task.report_progress(progress);
                }
            }
            WorkerEvent::Reply(WorkerReply::Complete { id, result }) => {
                self.complete_task(envelope.worker_id, id, result);
            }
            WorkerEvent::Reply(WorkerReply::Error { id, error, .. }) => {
                self.fail_task(envelope.worker_id, Some(id), error);
            }
            WorkerEvent::Fault { error } => {
                self.fail_task(envelope.worker_id, None, error);
            }
        }
    }

    fn complete_task(&mut self, worker_id: usize, id: TaskId, result: Value) {
        let Some(mut task) = self.active.remove(&id) else {
            return;
        };
        let key = task.key.clone();
        let duration_ms = task.started.elapsed().as_millis() as u64;
        // Successful tasks always observe a final 1.0.
        task.report_progress(1.0);
        task.finish(Ok(result));
        debug!(task_id = %id, worker_id, duration_ms, "task complete");

        let slot = &mut self.slots[worker_id];
        slot.current_task = None;
        slot.tasks_executed += 1;
        slot.last_task_at = Some(Utc::now());
        if self.config.enable_affinity {
            if let Some(key) = key {
                slot.cache_function(key, self.config.affinity_cache_limit);
            }
        }

        self.drain_queue();
    }

    /// Task-level error or adapter fault. The caller is rejected once
    /// and the worker is replaced unconditionally.
    fn fail_task(&mut self, worker_id: usize, id: Option<TaskId>, error: String) {
        let id = id.or(self.slots[worker_id].current_task);
        if let Some(task) = id.and_then(|id| self.active.remove(&id)) {
            task.finish(Err(ComputeError::WorkerExecution(error.clone())));
        }
        warn!(worker_id, error = %error, "worker failed, restarting");
        self.restart_worker(worker_id);
        self.drain_queue();
    }

    fn handle_timeout(&mut self, id: TaskId) {
        let Some(task) = self.active.remove(&id) else {
            return;
        };
        warn!(task_id = %id, timeout_ms = task.timeout_ms, "task timed out");

        match task.worker_id {
            Some(worker_id) => self.restart_worker(worker_id),
            // Still queued; just drop it from the queue.
            None => self.queue.retain(|t| t.id != id),
        }
        let timeout_ms = task.timeout_ms;
        task.finish(Err(ComputeError::TaskTimeout { timeout_ms }));
        self.drain_queue();
    }

    /// Replaces a worker in place: same slot id, next epoch, empty
    /// affinity cache. The old adapter's thread may still be running;
    /// its messages are filtered by the epoch check.
    fn restart_worker(&mut self, worker_id: usize) {
        let slot = &mut self.slots[worker_id];
        slot.adapter.terminate();
        slot.epoch += 1;
        slot.current_task = None;
        slot.cached_functions.clear();

        match self.factory.spawn(slot.id, slot.epoch, self.worker_tx.clone()) {
            Ok(adapter) => {
                slot.adapter = adapter;
                info!(worker_id, epoch = slot.epoch, "worker restarted");
            }
            Err(e) => {
                warn!(worker_id, error = %e, "failed to respawn worker");
            }
        }
    }

    // ── Diagnostics & shutdown ──────────────────────────────────────

    fn status(&self) -> PoolStatus {
        let total = self.slots.len();
        let available = self.slots.iter().filter(|s| s.is_idle()).count();
        PoolStatus {
            initialized: true,
            total_workers: total,
            available_workers: available,
            busy_workers: total - available,
            active_tasks: self.active.len() - self.queue.len(),
            queued_tasks: self.queue.len(),
            affinity: AffinityStatus {
                enabled: self.config.enable_affinity,
                cache_limit: self.config.affinity_cache_limit,
                hit_rate: self.hit_rate(),
            },
        }
    }

    fn affinity_stats(&self) -> AffinityStats {
        AffinityStats {
            hits: self.affinity_hits,
            misses: self.affinity_misses,
            hit_rate: self.hit_rate(),
            worker_caches: self
                .slots
                .iter()
                .map(|slot| WorkerCacheInfo {
                    worker_id: slot.id,
                    cached_functions: slot.cached_functions.iter().cloned().collect(),
                    tasks_executed: slot.tasks_executed,
                    last_task_at: slot.last_task_at,
                })
                .collect(),
        }
    }

    fn hit_rate(&self) -> f64 {
        let total = self.affinity_hits + self.affinity_misses;
        if total == 0 {
            0.0
        } else {
            self.affinity_hits as f64 / total as f64
        }
    }

    /// Graceful-shutdown wait: keep servicing worker events until all
    /// in-flight tasks resolve or the bound elapses.
    async fn drain(&mut self) {
        let deadline = Instant::now() + DRAIN_BOUND;
        while !self.active.is_empty() && Instant::now() < deadline {
            tokio::select! {
                Some(envelope) = self.worker_rx.recv() => self.handle_envelope(envelope),
                Some(id) = self.timer_rx.recv() => self.handle_timeout(id),
                _ = tokio::time::sleep(DRAIN_POLL) => {}
            }
        }
    }

    fn shutdown(&mut self) {
        let stragglers = self.active.len();
        for (_, task) in self.active.drain() {
            task.finish(Err(ComputeError::PoolTerminated));
        }
        self.queue.clear();
        for slot in &mut self.slots {
            slot.adapter.terminate();
        }
        info!(stragglers, "worker pool terminated");
    }
}
