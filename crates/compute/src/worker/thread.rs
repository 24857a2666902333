//! OS-thread worker. One dedicated thread per pool slot, fed through a
//! `std::sync::mpsc` inbox, reporting back on the pool's tokio channel.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::ComputeError;
use crate::protocol::{Envelope, Task, WorkerEvent, WorkerReply};
use crate::registry::ModuleRegistry;
use crate::worker::{WorkerAdapter, WorkerFactory};

pub struct ThreadWorkerFactory {
    registry: Arc<ModuleRegistry>,
}

impl ThreadWorkerFactory {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }
}

impl WorkerFactory for ThreadWorkerFactory {
    fn supported(&self) -> Result<(), ComputeError> {
        // std threads are always available on the targets we build for.
        Ok(())
    }

    fn spawn(
        &self,
        slot_id: usize,
        epoch: u64,
        sink: UnboundedSender<Envelope>,
    ) -> Result<Box<dyn WorkerAdapter>, ComputeError> {
        let (inbox_tx, inbox_rx) = mpsc::channel::<Task>();
        let registry = self.registry.clone();

        let handle = thread::Builder::new()
            .name(format!("lattice-worker-{slot_id}"))
            .spawn(move || worker_loop(slot_id, epoch, registry, inbox_rx, sink))
            .map_err(|e| {
                ComputeError::UnsupportedEnvironment(format!("failed to spawn worker thread: {e}"))
            })?;

        debug!(worker_id = slot_id, epoch, "worker thread spawned");
        Ok(Box::new(ThreadWorker {
            inbox: Some(inbox_tx),
            _handle: handle,
        }))
    }
}

struct ThreadWorker {
    inbox: Option<mpsc::Sender<Task>>,
    // Held so the thread isn't detached while the adapter lives; never
    // joined, a terminated worker may be mid-computation.
    _handle: thread::JoinHandle<()>,
}

impl WorkerAdapter for ThreadWorker {
    fn post(&self, task: Task) -> Result<(), ComputeError> {
        let inbox = self
            .inbox
            .as_ref()
            .ok_or(ComputeError::PoolTerminated)?;
        inbox
            .send(task)
            .map_err(|_| ComputeError::WorkerExecution("worker inbox closed".into()))
    }

    fn terminate(&mut self) {
        // Dropping the sender ends the worker loop once the current
        // task (if any) finishes; the thread is otherwise abandoned.
        self.inbox = None;
    }
}

/// Body of the worker thread: drain the inbox until it closes.
fn worker_loop(
    slot_id: usize,
    epoch: u64,
    registry: Arc<ModuleRegistry>,
    inbox: mpsc::Receiver<Task>,
    sink: UnboundedSender<Envelope>,
) {
    while let Ok(task) = inbox.recv() {
        let id = task.id;

        let progress_sink = sink.clone();
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
            registry.execute_task(&task, &report)
        }));

        let event = match outcome {
            Ok(Ok(result)) => WorkerEvent::Reply(WorkerReply::Complete { id, result }),
            Ok(Err(error)) => WorkerEvent::Reply(WorkerReply::Error {
                id,
                error: error.to_string(),
                stack: None,
            }),
            Err(panic) => {
                let message = panic_message(panic);
                warn!(worker_id = slot_id, task_id = %id, error = %message, "task panicked");
                WorkerEvent::Fault { error: message }
            }
        };

        if sink
            .send(Envelope {
                worker_id: slot_id,
                epoch,
                event,
            })
            .is_err()
        {
            // Pool is gone; nothing left to report to.
            break;
        }
    }
    debug!(worker_id = slot_id, epoch, "worker thread exiting");
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{TaskId, TaskSpec};
    use crate::registry::AlgorithmFn;
    use serde_json::{json, Value};

    fn panicking(_: &[Value], _: &dyn Fn(f64)) -> Result<Value, ComputeError> {
        panic!("deliberate test panic");
    }

    fn echo(args: &[Value], progress: &dyn Fn(f64)) -> Result<Value, ComputeError> {
        progress(0.5);
        progress(1.0);
        Ok(args.first().cloned().unwrap_or(Value::Null))
    }

    fn test_registry() -> Arc<ModuleRegistry> {
        let mut registry = ModuleRegistry::new();
        registry.register(
            "fixture",
            [
                ("echo", echo as AlgorithmFn),
                ("panicking", panicking as AlgorithmFn),
            ],
        );
        Arc::new(registry)
    }

    #[tokio::test]
    async fn executes_and_reports_progress() {
        let (sink, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let factory = ThreadWorkerFactory::new(test_registry());
        let mut worker = factory.spawn(0, 1, sink).unwrap();

        let task = TaskSpec::new("fixture", "echo", vec![json!("hi")]).with_id(TaskId(1));
        worker.post(task).unwrap();

        let mut saw_progress = false;
        loop {
            let envelope = rx.recv().await.unwrap();
            assert_eq!(envelope.worker_id, 0);
            assert_eq!(envelope.epoch, 1);
            match envelope.event {
                WorkerEvent::Reply(WorkerReply::Progress { .. }) => saw_progress = true,
                WorkerEvent::Reply(WorkerReply::Complete { id, result }) => {
                    assert_eq!(id, TaskId(1));
                    assert_eq!(result, json!("hi"));
                    break;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert!(saw_progress);
        worker.terminate();
    }

    #[tokio::test]
    async fn panic_becomes_fault() {
        let (sink, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let factory = ThreadWorkerFactory::new(test_registry());
        let mut worker = factory.spawn(3, 1, sink).unwrap();

        worker
            .post(TaskSpec::new("fixture", "panicking", vec![]).with_id(TaskId(2)))
            .unwrap();

        let envelope = rx.recv().await.unwrap();
        match envelope.event {
            WorkerEvent::Fault { error } => assert!(error.contains("deliberate test panic")),
            other => panic!("unexpected event: {other:?}"),
        }
        worker.terminate();
    }

    #[tokio::test]
    async fn post_after_terminate_fails() {
        let (sink, _rx) = tokio::sync::mpsc::unbounded_channel();
        let factory = ThreadWorkerFactory::new(test_registry());
        let mut worker = factory.spawn(0, 1, sink).unwrap();
        worker.terminate();

        let err = worker
            .post(TaskSpec::new("fixture", "echo", vec![]).with_id(TaskId(3)))
            .unwrap_err();
        assert_eq!(err, ComputeError::PoolTerminated);
    }
}
