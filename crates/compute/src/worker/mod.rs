//! Worker adapters — the isolation boundary between the pool and task
//! execution.
//!
//! The pool talks to workers exclusively through [`WorkerAdapter`]:
//! tasks go in via `post`, results come back as [`Envelope`]s on the
//! pool's event channel. [`WorkerFactory`] abstracts spawning so tests
//! can substitute a synchronous in-process adapter for real threads.

mod inline;
mod thread;

pub use inline::InlineWorkerFactory;
pub use thread::ThreadWorkerFactory;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::ComputeError;
use crate::protocol::{Envelope, Task};

/// One spawned worker, owned by a pool slot.
pub trait WorkerAdapter: Send {
    /// Hands a task to the worker. Replies arrive asynchronously on the
    /// envelope channel the worker was spawned with.
    fn post(&self, task: Task) -> Result<(), ComputeError>;

    /// Tears the worker down. A computation already running is
    /// abandoned, not interrupted; its late envelopes carry a stale
    /// epoch and are dropped by the pool.
    fn terminate(&mut self);
}

/// Spawns workers for the pool.
pub trait WorkerFactory: Send + Sync {
    /// Whether this environment can host workers at all. Checked once
    /// at pool initialization; failure is fatal.
    fn supported(&self) -> Result<(), ComputeError>;

    fn spawn(
        &self,
        slot_id: usize,
        epoch: u64,
        sink: UnboundedSender<Envelope>,
    ) -> Result<Box<dyn WorkerAdapter>, ComputeError>;
}
