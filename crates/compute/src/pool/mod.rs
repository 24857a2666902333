//! Affinity-aware worker pool.
//!
//! All pool state lives inside a single control loop task
//! ([`runner::PoolRunner`]); the public [`WorkerPool`] is a cheap
//! cloneable handle that talks to it over a command channel. When the
//! last handle is dropped the loop shuts down on its own.

mod runner;
mod state;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::error::ComputeError;
use crate::protocol::TaskSpec;
use crate::registry::ModuleRegistry;
use crate::worker::{ThreadWorkerFactory, WorkerFactory};

use runner::{Command, PoolRunner};
use state::WorkerSlot;

// ── Configuration ───────────────────────────────────────────────────

/// Pool configuration, typically deserialized from the host's config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of workers. 0 = detected core count.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Default per-task deadline in milliseconds.
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,
    /// Route repeated `(module, function)` tasks to the worker that
    /// ran them before.
    #[serde(default = "default_enable_affinity")]
    pub enable_affinity: bool,
    /// Per-worker affinity cache capacity.
    #[serde(default = "default_affinity_cache_limit")]
    pub affinity_cache_limit: usize,
}

fn default_max_workers() -> usize { 0 }
fn default_task_timeout_ms() -> u64 { 60_000 }
fn default_enable_affinity() -> bool { true }
fn default_affinity_cache_limit() -> usize { 50 }

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            task_timeout_ms: default_task_timeout_ms(),
            enable_affinity: default_enable_affinity(),
            affinity_cache_limit: default_affinity_cache_limit(),
        }
    }
}

impl PoolConfig {
    /// Resolve worker count (0 means use available parallelism).
    pub fn resolved_max_workers(&self) -> usize {
        if self.max_workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.max_workers
        }
        .max(1)
    }
}

// ── Per-call options ────────────────────────────────────────────────

/// Options for a single [`WorkerPool::execute`] call.
#[derive(Default)]
pub struct ExecOptions {
    /// Progress callback; receives clamped, non-decreasing fractions.
    pub on_progress: Option<Box<dyn Fn(f64) + Send + Sync>>,
    /// Overrides the pool's default task timeout.
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn with_progress(mut self, callback: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ── Diagnostics ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub initialized: bool,
    pub total_workers: usize,
    pub available_workers: usize,
    pub busy_workers: usize,
    pub active_tasks: usize,
    pub queued_tasks: usize,
    pub affinity: AffinityStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityStatus {
    pub enabled: bool,
    pub cache_limit: usize,
    pub hit_rate: f64,
}

impl PoolStatus {
    fn terminated() -> Self {
        Self {
            initialized: false,
            total_workers: 0,
            available_workers: 0,
            busy_workers: 0,
            active_tasks: 0,
            queued_tasks: 0,
            affinity: AffinityStatus::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub worker_caches: Vec<WorkerCacheInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerCacheInfo {
    pub worker_id: usize,
    pub cached_functions: Vec<String>,
    pub tasks_executed: u64,
    pub last_task_at: Option<DateTime<Utc>>,
}

// ── Pool handle ─────────────────────────────────────────────────────

/// Cloneable handle to a running pool.
#[derive(Clone)]
pub struct WorkerPool {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl WorkerPool {
    /// Creates a pool backed by OS-thread workers executing the
    /// built-in algorithm modules.
    pub async fn initialize(config: PoolConfig) -> Result<Self, ComputeError> {
        let registry = Arc::new(ModuleRegistry::with_builtins());
        Self::with_factory(config, Arc::new(ThreadWorkerFactory::new(registry))).await
    }

    /// Creates a pool with a caller-supplied worker factory (custom
    /// registries, inline adapters in tests).
    pub async fn with_factory(
        config: PoolConfig,
        factory: Arc<dyn WorkerFactory>,
    ) -> Result<Self, ComputeError> {
        factory.supported()?;

        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        let count = config.resolved_max_workers();
        let mut slots: Vec<WorkerSlot> = Vec::with_capacity(count);
        for id in 0..count {
            match factory.spawn(id, 1, worker_tx.clone()) {
                Ok(adapter) => slots.push(WorkerSlot::new(id, 1, adapter)),
                Err(e) => {
                    // Partial initialization leaves nothing behind.
                    for slot in &mut slots {
                        slot.adapter.terminate();
                    }
                    return Err(e);
                }
            }
        }

        info!(
            workers = count,
            affinity = config.enable_affinity,
            timeout_ms = config.task_timeout_ms,
            "worker pool initialized"
        );

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let runner = PoolRunner::new(config, factory, slots, worker_tx, worker_rx, cmd_rx);
        tokio::spawn(runner.run());

        Ok(Self { cmd_tx })
    }

    /// Submits a task and waits for its result.
    pub async fn execute(
        &self,
        spec: TaskSpec,
        opts: ExecOptions,
    ) -> Result<Value, ComputeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Execute {
                spec,
                opts,
                responder: tx,
            })
            .map_err(|_| ComputeError::PoolTerminated)?;
        rx.await.map_err(|_| ComputeError::PoolTerminated)?
    }

    pub async fn status(&self) -> PoolStatus {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Status { responder: tx }).is_err() {
            return PoolStatus::terminated();
        }
        rx.await.unwrap_or_else(|_| PoolStatus::terminated())
    }

    pub async fn affinity_stats(&self) -> AffinityStats {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::AffinityStats { responder: tx })
            .is_err()
        {
            return AffinityStats::default();
        }
        rx.await.unwrap_or_default()
    }

    /// Shuts the pool down. Unless `force`, waits up to 5 seconds for
    /// in-flight tasks to drain; stragglers are rejected with
    /// [`ComputeError::PoolTerminated`]. Idempotent.
    pub async fn terminate(&self, force: bool) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Terminate {
                force,
                responder: tx,
            })
            .is_err()
        {
            return;
        }
        let _ = rx.await;
    }
}
