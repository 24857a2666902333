//! Synchronous in-process worker, for deterministic tests.
//!
//! `post` executes the task on the caller's thread and pushes every
//! envelope before returning, so tests observe a fixed event order
//! without real parallelism.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::ComputeError;
use crate::protocol::{Envelope, Task, WorkerEvent, WorkerReply};
use crate::registry::ModuleRegistry;
use crate::worker::{WorkerAdapter, WorkerFactory};

pub struct InlineWorkerFactory {
    registry: Arc<ModuleRegistry>,
}

impl InlineWorkerFactory {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }
}

impl WorkerFactory for InlineWorkerFactory {
    fn supported(&self) -> Result<(), ComputeError> {
        Ok(())
    }

    fn spawn(
        &self,
        slot_id: usize,
        epoch: u64,
        sink: UnboundedSender<Envelope>,
    ) -> Result<Box<dyn WorkerAdapter>, ComputeError> {
        Ok(Box::new(InlineWorker {
            slot_id,
            epoch,
            registry: self.registry.clone(),
            sink: Some(sink),
        }))
    }
}

struct InlineWorker {
    slot_id: usize,
    epoch: u64,
    registry: Arc<ModuleRegistry>,
    sink: Option<UnboundedSender<Envelope>>,
}

impl InlineWorker {
    fn emit(&self, sink: &UnboundedSender<Envelope>, event: WorkerEvent) {
        let _ = sink.send(Envelope {
            worker_id: self.slot_id,
            epoch: self.epoch,
            event,
        });
    }
}

impl WorkerAdapter for InlineWorker {
    fn post(&self, task: Task) -> Result<(), ComputeError> {
        let sink = self.sink.as_ref().ok_or(ComputeError::PoolTerminated)?;
        let id = task.id;

        let progress_sink = sink.clone();
        let (slot_id, epoch) = (self.slot_id, self.epoch);
        let report = move |fraction: f64| {
            let _ = progress_sink.send(Envelope {
                worker_id: slot_id,
                epoch,
                event: WorkerEvent::Reply(WorkerReply::Progress {
                    id,
                    progress: fraction.clamp(0.0, 1.0),
                }),
            });
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.registry.execute_task(&task, &report)
        }));

        match outcome {
            Ok(Ok(result)) => {
                self.emit(sink, WorkerEvent::Reply(WorkerReply::Complete { id, result }));
            }
            Ok(Err(error)) => {
                self.emit(
                    sink,
                    WorkerEvent::Reply(WorkerReply::Error {
                        id,
                        error: error.to_string(),
                        stack: None,
                    }),
                );
            }
            Err(_) => {
                self.emit(
                    sink,
                    WorkerEvent::Fault {
                        error: "task panicked".into(),
                    },
                );
            }
        }
        Ok(())
    }

    fn terminate(&mut self) {
        self.sink = None;
    }
}
